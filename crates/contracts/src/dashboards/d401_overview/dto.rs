use serde::{Deserialize, Serialize};

use crate::domain::a003_normalized_order::NormalizedOrderDto;
use crate::enums::MarketplaceKind;

/// Сводные счётчики для главного дашборда
///
/// Нулевой арендатор (без подключений и данных) получает нули,
/// а не ошибку.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Сколько видов маркетплейсов поддерживается
    #[serde(rename = "totalMarketplaces")]
    pub total_marketplaces: i64,

    /// Сколько подключено (включая состояние sync_error)
    #[serde(rename = "connectedMarketplaces")]
    pub connected_marketplaces: i64,

    /// Товары без признака stale
    #[serde(rename = "totalProducts")]
    pub total_products: i64,

    /// Все заказы арендатора
    #[serde(rename = "totalOrders")]
    pub total_orders: i64,

    /// Выручка без отменённых и возвращённых заказов
    #[serde(rename = "totalRevenue")]
    pub total_revenue: f64,
}

/// Товар с остатком ниже порога
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub id: String,
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    pub sku: String,
    pub name: String,
    pub stock: i64,
    /// Оценка запаса в днях; None — спроса за окно не было
    #[serde(rename = "daysOfSupply")]
    pub days_of_supply: Option<f64>,
}

/// Ответ главного дашборда
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardOverviewResponse {
    pub stats: DashboardStats,

    /// Десять последних заказов
    #[serde(rename = "recentOrders")]
    pub recent_orders: Vec<NormalizedOrderDto>,

    /// До десяти товаров с низким остатком, отсортированных по
    /// оценке запаса в днях (наименьший запас первым)
    #[serde(rename = "lowStockProducts")]
    pub low_stock_products: Vec<LowStockProduct>,
}
