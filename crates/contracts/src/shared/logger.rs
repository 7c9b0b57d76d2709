use serde::{Deserialize, Serialize};

/// Запись операционного лога
///
/// Источником служат реальные события синхронизации и webhook-приёма;
/// лента активности в UI строится из этих записей.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    /// Подсистема-источник ("sync", "webhook", "credentials", "server")
    pub source: String,
    pub category: String,
    pub message: String,
}
