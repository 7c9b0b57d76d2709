use chrono::{DateTime, Utc};
use contracts::domain::a002_normalized_product::{NormalizedProduct, NormalizedProductId};
use contracts::domain::common::{BaseAggregate, EntityMetadata, TenantId};
use contracts::enums::MarketplaceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_normalized_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub marketplace_native_id: String,
    pub sku: String,
    pub price: f64,
    pub stock: i64,
    pub category: Option<String>,
    pub is_stale: bool,
    pub synced_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NormalizedProduct {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let tenant = Uuid::parse_str(&m.tenant_id).unwrap_or_else(|_| Uuid::nil());

        NormalizedProduct {
            base: BaseAggregate::with_metadata(
                NormalizedProductId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            tenant_id: TenantId::new(tenant),
            marketplace_kind: MarketplaceKind::from_code(&m.marketplace_kind)
                .unwrap_or(MarketplaceKind::Wildberries),
            marketplace_native_id: m.marketplace_native_id,
            sku: m.sku,
            price: m.price,
            stock: m.stock,
            category: m.category,
            is_stale: m.is_stale,
            synced_at: m.synced_at.unwrap_or_else(Utc::now),
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Товары арендатора с необязательными фильтрами по виду маркетплейса,
/// подстроке и порогу остатка
pub async fn list(
    tenant: &TenantId,
    kind: Option<MarketplaceKind>,
    search: Option<&str>,
    low_stock_below: Option<i64>,
) -> anyhow::Result<Vec<NormalizedProduct>> {
    let mut query = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::IsDeleted.eq(false));

    if let Some(kind) = kind {
        query = query.filter(Column::MarketplaceKind.eq(kind.code()));
    }
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(Column::Sku.contains(search))
                .add(Column::Description.contains(search)),
        );
    }
    if let Some(threshold) = low_stock_below {
        query = query.filter(Column::Stock.lt(threshold));
    }

    let mut items: Vec<NormalizedProduct> = query
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| a.sku.to_lowercase().cmp(&b.sku.to_lowercase()));
    Ok(items)
}

/// Товар по ключу уникальности (tenant, kind, native_id)
pub async fn get_by_native(
    tenant: &TenantId,
    kind: MarketplaceKind,
    native_id: &str,
) -> anyhow::Result<Option<NormalizedProduct>> {
    let result = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .filter(Column::MarketplaceNativeId.eq(native_id))
        .filter(Column::IsDeleted.eq(false))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &NormalizedProduct) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        marketplace_native_id: Set(aggregate.marketplace_native_id.clone()),
        sku: Set(aggregate.sku.clone()),
        price: Set(aggregate.price),
        stock: Set(aggregate.stock),
        category: Set(aggregate.category.clone()),
        is_stale: Set(aggregate.is_stale),
        synced_at: Set(Some(aggregate.synced_at)),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &NormalizedProduct) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        marketplace_native_id: Set(aggregate.marketplace_native_id.clone()),
        sku: Set(aggregate.sku.clone()),
        price: Set(aggregate.price),
        stock: Set(aggregate.stock),
        category: Set(aggregate.category.clone()),
        is_stale: Set(aggregate.is_stale),
        synced_at: Set(Some(aggregate.synced_at)),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}

/// Пометить устаревшими товары пары, не тронутые текущей выгрузкой
/// (synced_at раньше момента её старта). Возвращает число помеченных.
pub async fn mark_stale_before(
    tenant: &TenantId,
    kind: MarketplaceKind,
    cutoff: DateTime<Utc>,
) -> anyhow::Result<u64> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsStale, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::IsStale.eq(false))
        .filter(Column::SyncedAt.lt(cutoff))
        .exec(conn())
        .await?;
    Ok(result.rows_affected)
}
