use serde::{Deserialize, Serialize};

/// Итог одного запуска синхронизации
///
/// Счётчики отражают фактически применённые записи. Частичное применение
/// не гарантируется: сущности, зафиксированные до сбоя на позднем шаге,
/// остаются в БД, а сбой попадает в `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    /// Затронутые товары
    pub products: i64,

    /// Затронутые заказы
    pub orders: i64,

    /// Уникальные покупатели (по e-mail) среди затронутых заказов
    pub customers: i64,

    /// Ошибки отдельных записей, не оборвавшие запуск
    pub errors: Vec<String>,
}

impl SyncResult {
    /// Есть ли частичные ошибки
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
