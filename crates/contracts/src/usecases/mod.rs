pub mod common;

pub mod u601_sync_marketplace;
pub mod u602_ingest_webhook;
