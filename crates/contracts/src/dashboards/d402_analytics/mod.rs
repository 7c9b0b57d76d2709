pub mod dto;

pub use dto::{
    AnalyticsPeriod, AnalyticsResponse, AnalyticsSummary, DailyPoint, FunnelStage,
    MarketplaceBreakdown,
};
