pub mod u601_sync_marketplace;
pub mod u602_ingest_webhook;

#[cfg(test)]
mod scenario_tests;
