use chrono::Utc;
use contracts::domain::a001_marketplace_connection::{
    ConnectionState, MarketplaceConnection, MarketplaceConnectionId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata, TenantId};
use contracts::enums::MarketplaceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_marketplace_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub state: String,
    pub credential_ref: Option<String>,
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_error: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MarketplaceConnection {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let tenant = Uuid::parse_str(&m.tenant_id).unwrap_or_else(|_| Uuid::nil());

        MarketplaceConnection {
            base: BaseAggregate::with_metadata(
                MarketplaceConnectionId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            tenant_id: TenantId::new(tenant),
            marketplace_kind: MarketplaceKind::from_code(&m.marketplace_kind)
                .unwrap_or(MarketplaceKind::Wildberries),
            state: ConnectionState::from_code(&m.state).unwrap_or(ConnectionState::Disconnected),
            credential_ref: m.credential_ref.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
            last_sync_at: m.last_sync_at,
            last_sync_error: m.last_sync_error,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Активные (не удалённые) подключения арендатора
pub async fn list_for_tenant(tenant: &TenantId) -> anyhow::Result<Vec<MarketplaceConnection>> {
    let mut items: Vec<MarketplaceConnection> = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| {
        a.base
            .description
            .to_lowercase()
            .cmp(&b.base.description.to_lowercase())
    });
    Ok(items)
}

/// Активное подключение пары (tenant, kind); история soft-delete не видна
pub async fn get_active(
    tenant: &TenantId,
    kind: MarketplaceKind,
) -> anyhow::Result<Option<MarketplaceConnection>> {
    let result = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .filter(Column::IsDeleted.eq(false))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Все активные подключения всех арендаторов (для планировщика)
pub async fn list_all_active() -> anyhow::Result<Vec<MarketplaceConnection>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(conn())
        .await?;
    Ok(items.into_iter().map(Into::into).collect())
}

pub async fn insert(aggregate: &MarketplaceConnection) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        state: Set(aggregate.state.as_str().to_string()),
        credential_ref: Set(aggregate.credential_ref.map(|r| r.to_string())),
        last_sync_at: Set(aggregate.last_sync_at),
        last_sync_error: Set(aggregate.last_sync_error.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &MarketplaceConnection) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        state: Set(aggregate.state.as_str().to_string()),
        credential_ref: Set(aggregate.credential_ref.map(|r| r.to_string())),
        last_sync_at: Set(aggregate.last_sync_at),
        last_sync_error: Set(aggregate.last_sync_error.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}

/// Мягкое удаление: запись остаётся в истории, из активных выборок уходит
pub async fn soft_delete(id: Uuid) -> anyhow::Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(conn())
        .await?;
    Ok(result.rows_affected > 0)
}
