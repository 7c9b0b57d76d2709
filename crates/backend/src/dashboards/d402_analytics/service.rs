use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use contracts::dashboards::d402_analytics::{
    AnalyticsPeriod, AnalyticsResponse, AnalyticsSummary, DailyPoint, FunnelStage,
    MarketplaceBreakdown,
};
use contracts::domain::a003_normalized_order::OrderStatus;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;

use super::repository;
use crate::shared::error::OrchestratorError;

/// Аналитика арендатора за окно "7d" | "30d" | "90d"
pub async fn get_analytics(
    tenant: &TenantId,
    period_code: &str,
) -> Result<AnalyticsResponse, OrchestratorError> {
    let period = AnalyticsPeriod::from_code(period_code).ok_or_else(|| {
        OrchestratorError::Validation(format!(
            "Недопустимый период '{}', ожидается 7d, 30d или 90d",
            period_code
        ))
    })?;

    let today = Utc::now().date_naive();
    let start_date = today - Duration::days(period.days() - 1);
    let since = start_date
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();

    let summary_row = repository::get_period_summary(tenant, since).await?;
    let summary = AnalyticsSummary {
        total_orders: summary_row.total_orders,
        total_revenue: summary_row.total_revenue,
        avg_order_value: if summary_row.revenue_orders > 0 {
            summary_row.total_revenue / summary_row.revenue_orders as f64
        } else {
            0.0
        },
        active_marketplaces: summary_row.active_marketplaces,
    };

    let daily_rows = repository::get_daily_rows(tenant, since).await?;
    let by_day: HashMap<String, (i64, f64)> = daily_rows
        .into_iter()
        .map(|r| (r.day, (r.orders, r.revenue)))
        .collect();
    let daily = fill_daily(&by_day, start_date, period.days());

    let mp_rows = repository::get_marketplace_rows(tenant, since).await?;
    let mut by_marketplace: Vec<MarketplaceBreakdown> = mp_rows
        .into_iter()
        .map(|r| {
            let kind = MarketplaceKind::from_code(&r.marketplace_kind)
                .unwrap_or(MarketplaceKind::Wildberries);
            MarketplaceBreakdown {
                marketplace_kind: kind,
                display_name: kind.display_name().to_string(),
                orders: r.orders,
                revenue: r.revenue,
            }
        })
        .collect();
    by_marketplace.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.orders.cmp(&a.orders))
    });

    let status_rows = repository::get_status_counts(tenant, since).await?;
    let mut status_counts: HashMap<OrderStatus, i64> = HashMap::new();
    for row in status_rows {
        if let Some(status) = OrderStatus::from_code(&row.status) {
            *status_counts.entry(status).or_insert(0) += row.cnt;
        }
    }
    let funnel = build_funnel(&status_counts);

    Ok(AnalyticsResponse {
        period: period.as_str().to_string(),
        summary,
        daily,
        by_marketplace,
        funnel,
    })
}

/// Дневной ряд с точкой на каждый день окна; дни без заказов
/// получают нули
fn fill_daily(by_day: &HashMap<String, (i64, f64)>, start: NaiveDate, days: i64) -> Vec<DailyPoint> {
    (0..days)
        .map(|offset| {
            let date = (start + Duration::days(offset))
                .format("%Y-%m-%d")
                .to_string();
            let (orders, revenue) = by_day.get(&date).copied().unwrap_or((0, 0.0));
            DailyPoint {
                date,
                orders,
                revenue,
            }
        })
        .collect()
}

/// Воронка конверсии: каждая ступень считает заказы, дошедшие минимум
/// до неё. Отменённые и возвращённые попадают только в первую ступень.
/// Процент считается от первой ступени; пустое окно даёт нули.
fn build_funnel(status_counts: &HashMap<OrderStatus, i64>) -> Vec<FunnelStage> {
    let count = |status: OrderStatus| status_counts.get(&status).copied().unwrap_or(0);

    let delivered = count(OrderStatus::Delivered);
    let shipped = count(OrderStatus::Shipped) + delivered;
    let processing = count(OrderStatus::Processing) + shipped;
    let reached_new = count(OrderStatus::New)
        + processing
        + count(OrderStatus::Cancelled)
        + count(OrderStatus::Returned);

    let pct = |reached: i64| {
        if reached_new > 0 {
            reached as f64 / reached_new as f64 * 100.0
        } else {
            0.0
        }
    };

    vec![
        FunnelStage {
            stage: OrderStatus::New,
            count: reached_new,
            pct: pct(reached_new),
        },
        FunnelStage {
            stage: OrderStatus::Processing,
            count: processing,
            pct: pct(processing),
        },
        FunnelStage {
            stage: OrderStatus::Shipped,
            count: shipped,
            pct: pct(shipped),
        },
        FunnelStage {
            stage: OrderStatus::Delivered,
            count: delivered,
            pct: pct(delivered),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(OrderStatus, i64)]) -> HashMap<OrderStatus, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn funnel_counts_orders_that_reached_each_stage() {
        // 2 new, 1 processing, 3 shipped, 4 delivered, 2 cancelled
        let funnel = build_funnel(&counts(&[
            (OrderStatus::New, 2),
            (OrderStatus::Processing, 1),
            (OrderStatus::Shipped, 3),
            (OrderStatus::Delivered, 4),
            (OrderStatus::Cancelled, 2),
        ]));

        assert_eq!(funnel[0].count, 12); // все заказы дошли до new
        assert_eq!(funnel[1].count, 8); // processing и дальше
        assert_eq!(funnel[2].count, 7); // shipped и дальше
        assert_eq!(funnel[3].count, 4);
        assert_eq!(funnel[0].pct, 100.0);
        assert!((funnel[2].pct - 7.0 / 12.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn cancelled_and_returned_count_toward_first_stage_only() {
        let funnel = build_funnel(&counts(&[
            (OrderStatus::Cancelled, 3),
            (OrderStatus::Returned, 2),
        ]));

        assert_eq!(funnel[0].count, 5);
        assert_eq!(funnel[1].count, 0);
        assert_eq!(funnel[2].count, 0);
        assert_eq!(funnel[3].count, 0);
    }

    #[test]
    fn empty_window_gives_zero_percentages() {
        let funnel = build_funnel(&HashMap::new());
        for stage in &funnel {
            assert_eq!(stage.count, 0);
            assert_eq!(stage.pct, 0.0);
        }
    }

    #[test]
    fn daily_series_zero_fills_missing_days() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut by_day = HashMap::new();
        by_day.insert("2025-03-02".to_string(), (3, 450.0));

        let daily = fill_daily(&by_day, start, 4);

        assert_eq!(daily.len(), 4);
        assert_eq!(daily[0].date, "2025-03-01");
        assert_eq!(daily[0].orders, 0);
        assert_eq!(daily[1].date, "2025-03-02");
        assert_eq!(daily[1].orders, 3);
        assert_eq!(daily[1].revenue, 450.0);
        assert_eq!(daily[3].date, "2025-03-04");
        assert_eq!(daily[3].revenue, 0.0);
    }
}
