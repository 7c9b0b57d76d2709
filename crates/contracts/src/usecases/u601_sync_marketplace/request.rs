use serde::{Deserialize, Serialize};

/// Запрос на запуск синхронизации
///
/// Вид маркетплейса и арендатор приходят из URL и заголовка;
/// тело несёт только режим запуска.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Режим запуска (опционально)
    #[serde(default)]
    pub mode: SyncMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Запуск из UI (интерактивный)
    #[default]
    Interactive,

    /// Фоновый запуск (планировщик)
    Background,
}
