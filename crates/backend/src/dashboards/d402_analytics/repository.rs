use anyhow::Result;
use chrono::{DateTime, Utc};
use contracts::domain::common::TenantId;
use sea_orm::{FromQueryResult, Statement};

use crate::shared::data::db::get_connection;

/// Сводка окна аналитики одной строкой
#[derive(Debug, Clone, FromQueryResult)]
pub struct PeriodSummaryRow {
    pub total_orders: i64,
    pub revenue_orders: i64,
    pub total_revenue: f64,
    pub active_marketplaces: i64,
}

pub async fn get_period_summary(
    tenant: &TenantId,
    since: DateTime<Utc>,
) -> Result<PeriodSummaryRow> {
    let db = get_connection();

    let sql = r#"
        SELECT
            COUNT(*) AS total_orders,
            COALESCE(SUM(CASE WHEN status NOT IN ('cancelled', 'returned')
                              THEN 1 ELSE 0 END), 0) AS revenue_orders,
            COALESCE(SUM(CASE WHEN status NOT IN ('cancelled', 'returned')
                              THEN total_amount ELSE 0 END), 0) AS total_revenue,
            COUNT(DISTINCT marketplace_kind) AS active_marketplaces
        FROM a003_normalized_order
        WHERE tenant_id = ? AND is_deleted = 0 AND order_date >= ?
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [tenant.value().to_string().into(), since.into()],
    );

    let row = PeriodSummaryRow::find_by_statement(stmt)
        .one(db)
        .await?
        .unwrap_or(PeriodSummaryRow {
            total_orders: 0,
            revenue_orders: 0,
            total_revenue: 0.0,
            active_marketplaces: 0,
        });

    Ok(row)
}

/// Агрегат одного дня окна
#[derive(Debug, Clone, FromQueryResult)]
pub struct DailyRow {
    pub day: String,
    pub orders: i64,
    pub revenue: f64,
}

pub async fn get_daily_rows(tenant: &TenantId, since: DateTime<Utc>) -> Result<Vec<DailyRow>> {
    let db = get_connection();

    let sql = r#"
        SELECT
            substr(order_date, 1, 10) AS day,
            COUNT(*) AS orders,
            COALESCE(SUM(CASE WHEN status NOT IN ('cancelled', 'returned')
                              THEN total_amount ELSE 0 END), 0) AS revenue
        FROM a003_normalized_order
        WHERE tenant_id = ? AND is_deleted = 0 AND order_date >= ?
        GROUP BY day
        ORDER BY day
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [tenant.value().to_string().into(), since.into()],
    );

    let rows = DailyRow::find_by_statement(stmt).all(db).await?;
    Ok(rows)
}

/// Агрегат одного маркетплейса за окно
#[derive(Debug, Clone, FromQueryResult)]
pub struct MarketplaceRow {
    pub marketplace_kind: String,
    pub orders: i64,
    pub revenue: f64,
}

pub async fn get_marketplace_rows(
    tenant: &TenantId,
    since: DateTime<Utc>,
) -> Result<Vec<MarketplaceRow>> {
    let db = get_connection();

    let sql = r#"
        SELECT
            marketplace_kind,
            COUNT(*) AS orders,
            COALESCE(SUM(CASE WHEN status NOT IN ('cancelled', 'returned')
                              THEN total_amount ELSE 0 END), 0) AS revenue
        FROM a003_normalized_order
        WHERE tenant_id = ? AND is_deleted = 0 AND order_date >= ?
        GROUP BY marketplace_kind
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [tenant.value().to_string().into(), since.into()],
    );

    let rows = MarketplaceRow::find_by_statement(stmt).all(db).await?;
    Ok(rows)
}

/// Количество заказов окна в каждом статусе
#[derive(Debug, Clone, FromQueryResult)]
pub struct StatusCountRow {
    pub status: String,
    pub cnt: i64,
}

pub async fn get_status_counts(
    tenant: &TenantId,
    since: DateTime<Utc>,
) -> Result<Vec<StatusCountRow>> {
    let db = get_connection();

    let sql = r#"
        SELECT status, COUNT(*) AS cnt
        FROM a003_normalized_order
        WHERE tenant_id = ? AND is_deleted = 0 AND order_date >= ?
        GROUP BY status
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [tenant.value().to_string().into(), since.into()],
    );

    let rows = StatusCountRow::find_by_statement(stmt).all(db).await?;
    Ok(rows)
}
