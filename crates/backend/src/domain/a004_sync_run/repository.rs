use chrono::Utc;
use contracts::domain::a004_sync_run::{SyncRun, SyncRunId};
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_sync_run")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub products_touched: i64,
    pub orders_touched: i64,
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SyncRun {
    fn from(m: Model) -> Self {
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let tenant = Uuid::parse_str(&m.tenant_id).unwrap_or_else(|_| Uuid::nil());

        SyncRun {
            id: SyncRunId::new(uuid),
            tenant_id: TenantId::new(tenant),
            marketplace_kind: MarketplaceKind::from_code(&m.marketplace_kind)
                .unwrap_or(MarketplaceKind::Wildberries),
            started_at: m.started_at.unwrap_or_else(Utc::now),
            finished_at: m.finished_at,
            products_touched: m.products_touched,
            orders_touched: m.orders_touched,
            error: m.error,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn insert(run: &SyncRun) -> anyhow::Result<Uuid> {
    let uuid = run.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        tenant_id: Set(run.tenant_id.value().to_string()),
        marketplace_kind: Set(run.marketplace_kind.code().to_string()),
        started_at: Set(Some(run.started_at)),
        finished_at: Set(run.finished_at),
        products_touched: Set(run.products_touched),
        orders_touched: Set(run.orders_touched),
        error: Set(run.error.clone()),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(run: &SyncRun) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(run.id.value().to_string()),
        tenant_id: Set(run.tenant_id.value().to_string()),
        marketplace_kind: Set(run.marketplace_kind.code().to_string()),
        started_at: Set(Some(run.started_at)),
        finished_at: Set(run.finished_at),
        products_touched: Set(run.products_touched),
        orders_touched: Set(run.orders_touched),
        error: Set(run.error.clone()),
    };
    active.update(conn()).await?;
    Ok(())
}

/// Последние запуски синхронизации арендатора, свежие сверху
pub async fn list_recent(
    tenant: &TenantId,
    kind: Option<MarketplaceKind>,
    limit: u64,
) -> anyhow::Result<Vec<SyncRun>> {
    let mut query = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .order_by_desc(Column::StartedAt)
        .limit(limit);

    if let Some(kind) = kind {
        query = query.filter(Column::MarketplaceKind.eq(kind.code()));
    }

    let items = query.all(conn()).await?;
    Ok(items.into_iter().map(Into::into).collect())
}
