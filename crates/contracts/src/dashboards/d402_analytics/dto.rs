use serde::{Deserialize, Serialize};

use crate::domain::a003_normalized_order::OrderStatus;
use crate::enums::MarketplaceKind;

/// Окно аналитики
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyticsPeriod {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl AnalyticsPeriod {
    /// Длина окна в днях
    pub fn days(&self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    /// Парсинг из кода запроса ("7d" | "30d" | "90d")
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            "90d" => Some(Self::Quarter),
            _ => None,
        }
    }
}

/// Сводка за период
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(rename = "totalOrders")]
    pub total_orders: i64,
    #[serde(rename = "totalRevenue")]
    pub total_revenue: f64,
    #[serde(rename = "avgOrderValue")]
    pub avg_order_value: f64,
    #[serde(rename = "activeMarketplaces")]
    pub active_marketplaces: i64,
}

/// Точка дневного ряда
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    /// Дата в формате YYYY-MM-DD
    pub date: String,
    pub orders: i64,
    pub revenue: f64,
}

/// Срез по одному маркетплейсу
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceBreakdown {
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub orders: i64,
    pub revenue: f64,
}

/// Ступень воронки конверсии
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
    /// Статус-ступень (new, processing, shipped, delivered)
    pub stage: OrderStatus,
    /// Заказы, дошедшие минимум до этой ступени
    pub count: i64,
    /// Процент от первой ступени
    pub pct: f64,
}

/// Ответ аналитики за период
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    /// Код периода ("7d" | "30d" | "90d")
    pub period: String,
    pub summary: AnalyticsSummary,
    /// Дневной ряд, по точке на каждый день окна (нули заполняются)
    pub daily: Vec<DailyPoint>,
    /// Маркетплейсы по убыванию выручки
    #[serde(rename = "byMarketplace")]
    pub by_marketplace: Vec<MarketplaceBreakdown>,
    /// Воронка конверсии
    pub funnel: Vec<FunnelStage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_codes_round_trip() {
        for period in [
            AnalyticsPeriod::Week,
            AnalyticsPeriod::Month,
            AnalyticsPeriod::Quarter,
        ] {
            assert_eq!(AnalyticsPeriod::from_code(period.as_str()), Some(period));
        }
    }

    #[test]
    fn arbitrary_period_is_rejected() {
        assert_eq!(AnalyticsPeriod::from_code("14d"), None);
        assert_eq!(AnalyticsPeriod::from_code(""), None);
    }

    #[test]
    fn period_days() {
        assert_eq!(AnalyticsPeriod::Week.days(), 7);
        assert_eq!(AnalyticsPeriod::Month.days(), 30);
        assert_eq!(AnalyticsPeriod::Quarter.days(), 90);
    }
}
