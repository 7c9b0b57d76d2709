pub mod common;

pub mod a001_marketplace_connection;
pub mod a002_normalized_product;
pub mod a003_normalized_order;
pub mod a004_sync_run;
