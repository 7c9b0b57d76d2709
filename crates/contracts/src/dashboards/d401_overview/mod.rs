pub mod dto;

pub use dto::{DashboardOverviewResponse, DashboardStats, LowStockProduct};
