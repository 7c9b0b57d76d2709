use anyhow::Result;
use chrono::{DateTime, Utc};
use contracts::domain::common::TenantId;
use sea_orm::{FromQueryResult, Statement};

use crate::shared::data::db::get_connection;

/// Сводные счётчики по записям арендатора
#[derive(Debug, Clone, FromQueryResult)]
pub struct TenantCounters {
    pub connected: i64,
    pub products: i64,
    pub orders: i64,
    pub revenue: f64,
}

pub async fn get_tenant_counters(tenant: &TenantId) -> Result<TenantCounters> {
    let db = get_connection();

    let sql = r#"
        SELECT
            (SELECT COUNT(*) FROM a001_marketplace_connection
             WHERE tenant_id = ? AND is_deleted = 0
               AND state IN ('connected', 'sync_error')) AS connected,
            (SELECT COUNT(*) FROM a002_normalized_product
             WHERE tenant_id = ? AND is_deleted = 0 AND is_stale = 0) AS products,
            (SELECT COUNT(*) FROM a003_normalized_order
             WHERE tenant_id = ? AND is_deleted = 0) AS orders,
            (SELECT COALESCE(SUM(total_amount), 0.0) FROM a003_normalized_order
             WHERE tenant_id = ? AND is_deleted = 0
               AND status NOT IN ('cancelled', 'returned')) AS revenue
    "#;

    let tenant_id = tenant.value().to_string();
    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [
            tenant_id.clone().into(),
            tenant_id.clone().into(),
            tenant_id.clone().into(),
            tenant_id.into(),
        ],
    );

    let counters = TenantCounters::find_by_statement(stmt)
        .one(db)
        .await?
        .unwrap_or(TenantCounters {
            connected: 0,
            products: 0,
            orders: 0,
            revenue: 0.0,
        });

    Ok(counters)
}

/// Товар с остатком ниже порога
#[derive(Debug, Clone, FromQueryResult)]
pub struct LowStockRow {
    pub id: String,
    pub marketplace_kind: String,
    pub sku: String,
    pub description: String,
    pub stock: i64,
}

pub async fn get_low_stock_products(
    tenant: &TenantId,
    threshold: i64,
) -> Result<Vec<LowStockRow>> {
    let db = get_connection();

    let sql = r#"
        SELECT id, marketplace_kind, sku, description, stock
        FROM a002_normalized_product
        WHERE tenant_id = ? AND is_deleted = 0 AND is_stale = 0 AND stock < ?
        ORDER BY stock ASC
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [tenant.value().to_string().into(), threshold.into()],
    );

    let rows = LowStockRow::find_by_statement(stmt).all(db).await?;
    Ok(rows)
}

/// Спрос и ассортимент маркетплейса для оценки запаса в днях
#[derive(Debug, Clone, FromQueryResult)]
pub struct MarketplaceDemandRow {
    pub marketplace_kind: String,
    pub items_sold: i64,
    pub product_count: i64,
}

/// Суммарный item_count заказов пары за окно и число активных товаров
pub async fn get_marketplace_demand(
    tenant: &TenantId,
    since: DateTime<Utc>,
) -> Result<Vec<MarketplaceDemandRow>> {
    let db = get_connection();

    let sql = r#"
        SELECT
            p.marketplace_kind,
            COALESCE((SELECT SUM(o.item_count) FROM a003_normalized_order o
                      WHERE o.tenant_id = p.tenant_id
                        AND o.marketplace_kind = p.marketplace_kind
                        AND o.is_deleted = 0
                        AND o.order_date >= ?), 0) AS items_sold,
            COUNT(*) AS product_count
        FROM a002_normalized_product p
        WHERE p.tenant_id = ? AND p.is_deleted = 0 AND p.is_stale = 0
        GROUP BY p.marketplace_kind
    "#;

    let stmt = Statement::from_sql_and_values(
        sea_orm::DatabaseBackend::Sqlite,
        sql,
        [since.into(), tenant.value().to_string().into()],
    );

    let rows = MarketplaceDemandRow::find_by_statement(stmt).all(db).await?;
    Ok(rows)
}
