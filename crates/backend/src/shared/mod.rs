pub mod config;
pub mod credentials;
pub mod crypto;
pub mod data;
pub mod error;
pub mod logger;
pub mod marketplaces;
pub mod sync_gate;
