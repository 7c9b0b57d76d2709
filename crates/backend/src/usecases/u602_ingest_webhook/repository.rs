use chrono::Utc;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement,
};

use crate::shared::data::db::get_connection;

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_PROCESSED: &str = "processed";
pub const STATUS_FAILED: &str = "failed";

/// Очередь webhook-событий и одновременно окно дедупликации:
/// строка остаётся после обработки, пока её не вытеснит ограничение
/// на размер окна пары.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub event_id: String,
    pub event_type: String,
    pub payload: String,
    pub status: String,
    pub received_at: Option<chrono::DateTime<chrono::Utc>>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Есть ли событие с таким event_id в окне пары
pub async fn exists(
    tenant: &TenantId,
    kind: MarketplaceKind,
    event_id: &str,
) -> anyhow::Result<bool> {
    let found = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .filter(Column::EventId.eq(event_id))
        .one(conn())
        .await?;
    Ok(found.is_some())
}

/// Надёжно поставить событие в очередь; порядок прибытия задаёт
/// автоинкрементный id
pub async fn enqueue(
    tenant: &TenantId,
    kind: MarketplaceKind,
    event_id: &str,
    event_type: &str,
    payload: String,
) -> anyhow::Result<i64> {
    let active = ActiveModel {
        tenant_id: Set(tenant.value().to_string()),
        marketplace_kind: Set(kind.code().to_string()),
        event_id: Set(event_id.to_string()),
        event_type: Set(event_type.to_string()),
        payload: Set(payload),
        status: Set(STATUS_QUEUED.to_string()),
        received_at: Set(Some(Utc::now())),
        processed_at: Set(None),
        error: Set(None),
        ..Default::default()
    };
    let inserted = active.insert(conn()).await?;
    Ok(inserted.id)
}

/// Очередь на обработку в порядке прибытия
pub async fn list_queued(limit: u64) -> anyhow::Result<Vec<Model>> {
    let items = Entity::find()
        .filter(Column::Status.eq(STATUS_QUEUED))
        .order_by_asc(Column::Id)
        .limit(limit)
        .all(conn())
        .await?;
    Ok(items)
}

pub async fn mark_processed(id: i64) -> anyhow::Result<()> {
    use sea_orm::sea_query::Expr;
    Entity::update_many()
        .col_expr(Column::Status, Expr::value(STATUS_PROCESSED))
        .col_expr(Column::ProcessedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn())
        .await?;
    Ok(())
}

pub async fn mark_failed(id: i64, error: &str) -> anyhow::Result<()> {
    use sea_orm::sea_query::Expr;
    Entity::update_many()
        .col_expr(Column::Status, Expr::value(STATUS_FAILED))
        .col_expr(Column::ProcessedAt, Expr::value(Utc::now()))
        .col_expr(Column::Error, Expr::value(error))
        .filter(Column::Id.eq(id))
        .exec(conn())
        .await?;
    Ok(())
}

/// Обрезать окно пары до `keep` последних событий. Необработанные
/// строки не выбрасываем, даже когда окно переполнено.
pub async fn prune_pair(
    tenant: &TenantId,
    kind: MarketplaceKind,
    keep: u64,
) -> anyhow::Result<u64> {
    let sql = r#"
        DELETE FROM webhook_event
        WHERE tenant_id = ? AND marketplace_kind = ? AND status <> ?
          AND id NOT IN (
            SELECT id FROM webhook_event
            WHERE tenant_id = ? AND marketplace_kind = ?
            ORDER BY id DESC
            LIMIT ?
          )
    "#;
    let result = conn()
        .execute(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            [
                tenant.value().to_string().into(),
                kind.code().into(),
                STATUS_QUEUED.into(),
                tenant.value().to_string().into(),
                kind.code().into(),
                (keep as i64).into(),
            ],
        ))
        .await?;
    Ok(result.rows_affected())
}
