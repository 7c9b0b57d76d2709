pub mod ingestor;
pub mod repository;
pub mod worker;
