pub mod aggregate;

pub use aggregate::{SyncRun, SyncRunId};
