use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use chrono::{Duration, Utc};
use contracts::dashboards::d401_overview::{
    DashboardOverviewResponse, DashboardStats, LowStockProduct,
};
use contracts::domain::a003_normalized_order::NormalizedOrderDto;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;

use super::repository;
use crate::domain::a003_normalized_order;
use crate::shared::config::get_config;

/// Окно оценки спроса для запаса в днях
const DEMAND_WINDOW_DAYS: i64 = 30;

/// Главный дашборд арендатора: счётчики, последние заказы, товары
/// с низким остатком. Пустой арендатор получает нули, не ошибку.
pub async fn get_overview(tenant: &TenantId) -> Result<DashboardOverviewResponse> {
    let counters = repository::get_tenant_counters(tenant).await?;
    let stats = DashboardStats {
        total_marketplaces: MarketplaceKind::all().len() as i64,
        connected_marketplaces: counters.connected,
        total_products: counters.products,
        total_orders: counters.orders,
        total_revenue: counters.revenue,
    };

    let recent = a003_normalized_order::repository::list_recent(tenant, 10).await?;
    let recent_orders = recent.iter().map(NormalizedOrderDto::from).collect();

    let threshold = get_config().sync.low_stock_threshold;
    let low_rows = repository::get_low_stock_products(tenant, threshold).await?;
    let since = Utc::now() - Duration::days(DEMAND_WINDOW_DAYS);
    let demand_rows = repository::get_marketplace_demand(tenant, since).await?;

    let demand: HashMap<String, (i64, i64)> = demand_rows
        .into_iter()
        .map(|r| (r.marketplace_kind, (r.items_sold, r.product_count)))
        .collect();

    let mut low_stock_products: Vec<LowStockProduct> = low_rows
        .into_iter()
        .map(|row| {
            let (items_sold, product_count) = demand
                .get(&row.marketplace_kind)
                .copied()
                .unwrap_or((0, 0));
            LowStockProduct {
                id: row.id,
                marketplace_kind: MarketplaceKind::from_code(&row.marketplace_kind)
                    .unwrap_or(MarketplaceKind::Wildberries),
                sku: row.sku,
                name: row.description,
                stock: row.stock,
                days_of_supply: days_of_supply(row.stock, items_sold, product_count),
            }
        })
        .collect();
    rank_low_stock(&mut low_stock_products);
    low_stock_products.truncate(10);

    Ok(DashboardOverviewResponse {
        stats,
        recent_orders,
        low_stock_products,
    })
}

/// Оценка запаса в днях: остаток, делённый на дневной спрос товара.
/// Спрос маркетплейса распределяется поровну между его активными
/// товарами, так как заказы не несут построчного состава.
fn days_of_supply(stock: i64, items_sold: i64, product_count: i64) -> Option<f64> {
    if items_sold <= 0 || product_count <= 0 {
        return None;
    }
    let daily_demand = items_sold as f64 / product_count as f64 / DEMAND_WINDOW_DAYS as f64;
    if daily_demand <= 0.0 {
        return None;
    }
    Some(stock as f64 / daily_demand)
}

/// Меньший запас в днях первым; товары без спроса в конце,
/// при равенстве меньший остаток первым
fn rank_low_stock(list: &mut [LowStockProduct]) {
    list.sort_by(|a, b| match (a.days_of_supply, b.days_of_supply) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then(a.stock.cmp(&b.stock)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.stock.cmp(&b.stock),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, days: Option<f64>) -> LowStockProduct {
        LowStockProduct {
            id: uuid::Uuid::new_v4().to_string(),
            marketplace_kind: MarketplaceKind::Ozon,
            sku: format!("SKU-{}", stock),
            name: "Товар".to_string(),
            stock,
            days_of_supply: days,
        }
    }

    #[test]
    fn days_of_supply_distributes_demand_evenly() {
        // 60 единиц за 30 дней на 2 товара: по единице в день на товар
        assert_eq!(days_of_supply(10, 60, 2), Some(10.0));
        assert_eq!(days_of_supply(3, 60, 2), Some(3.0));
    }

    #[test]
    fn zero_demand_gives_no_estimate() {
        assert_eq!(days_of_supply(5, 0, 3), None);
        assert_eq!(days_of_supply(5, 10, 0), None);
    }

    #[test]
    fn ranking_puts_smallest_supply_first_and_no_demand_last() {
        let mut list = vec![
            product(8, None),
            product(2, Some(6.0)),
            product(9, Some(1.5)),
            product(1, None),
        ];
        rank_low_stock(&mut list);

        assert_eq!(list[0].days_of_supply, Some(1.5));
        assert_eq!(list[1].days_of_supply, Some(6.0));
        // без оценки спроса в конце, меньший остаток первым
        assert_eq!(list[2].stock, 1);
        assert_eq!(list[3].stock, 8);
    }
}
