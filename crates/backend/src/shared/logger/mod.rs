pub mod repository;

use repository::log_event_internal;

/// Логирование события на сервере
///
/// # Примеры
/// ```
/// logger::log("sync", "Синхронизация ozon завершена: 12 товаров");
/// logger::log("webhook", "Отклонено событие с неверной подписью");
/// ```
pub fn log(category: &str, message: &str) {
    log_event_internal("server", category, message);
}
