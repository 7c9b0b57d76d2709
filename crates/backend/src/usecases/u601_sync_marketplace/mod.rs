pub mod executor;

pub use executor::SyncExecutor;

use once_cell::sync::Lazy;
use std::sync::Arc;

/// Единственный на процесс executor: HTTP-обработчики и планировщик
/// делят один учёт запущенных синхронизаций
pub static SYNC_EXECUTOR: Lazy<Arc<SyncExecutor>> = Lazy::new(|| Arc::new(SyncExecutor::new()));
