use chrono::Utc;
use contracts::domain::a003_normalized_order::{
    NormalizedOrder, NormalizedOrderId, OrderStatus,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata, TenantId};
use contracts::enums::MarketplaceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_normalized_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub marketplace_native_order_id: String,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub status: String,
    pub total_amount: f64,
    pub item_count: i64,
    pub order_date: Option<chrono::DateTime<chrono::Utc>>,
    pub tracking_number: Option<String>,
    pub fulfillment_type: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NormalizedOrder {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let tenant = Uuid::parse_str(&m.tenant_id).unwrap_or_else(|_| Uuid::nil());

        NormalizedOrder {
            base: BaseAggregate::with_metadata(
                NormalizedOrderId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            tenant_id: TenantId::new(tenant),
            marketplace_kind: MarketplaceKind::from_code(&m.marketplace_kind)
                .unwrap_or(MarketplaceKind::Wildberries),
            marketplace_native_order_id: m.marketplace_native_order_id,
            order_number: m.order_number,
            customer_name: m.customer_name,
            customer_email: m.customer_email,
            status: OrderStatus::from_code(&m.status).unwrap_or(OrderStatus::New),
            total_amount: m.total_amount,
            item_count: m.item_count,
            order_date: m.order_date.unwrap_or_else(Utc::now),
            tracking_number: m.tracking_number,
            fulfillment_type: m.fulfillment_type,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Заказы арендатора с фильтрами, свежие сверху
pub async fn list(
    tenant: &TenantId,
    kind: Option<MarketplaceKind>,
    status: Option<OrderStatus>,
    search: Option<&str>,
) -> anyhow::Result<Vec<NormalizedOrder>> {
    let mut query = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::IsDeleted.eq(false));

    if let Some(kind) = kind {
        query = query.filter(Column::MarketplaceKind.eq(kind.code()));
    }
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(Column::OrderNumber.contains(search))
                .add(Column::CustomerName.contains(search)),
        );
    }

    let mut items: Vec<NormalizedOrder> = query
        .all(conn())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    items.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(items)
}

/// Последние заказы арендатора, свежие сверху
pub async fn list_recent(tenant: &TenantId, limit: u64) -> anyhow::Result<Vec<NormalizedOrder>> {
    let items = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::IsDeleted.eq(false))
        .order_by_desc(Column::OrderDate)
        .limit(limit)
        .all(conn())
        .await?;
    Ok(items.into_iter().map(Into::into).collect())
}

/// Заказ по ключу уникальности (tenant, kind, native_order_id)
pub async fn get_by_native(
    tenant: &TenantId,
    kind: MarketplaceKind,
    native_order_id: &str,
) -> anyhow::Result<Option<NormalizedOrder>> {
    let result = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .filter(Column::MarketplaceNativeOrderId.eq(native_order_id))
        .filter(Column::IsDeleted.eq(false))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Заказ арендатора по внутреннему ID
pub async fn get_by_id(tenant: &TenantId, id: &Uuid) -> anyhow::Result<Option<NormalizedOrder>> {
    let result = Entity::find_by_id(id.to_string())
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::IsDeleted.eq(false))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &NormalizedOrder) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        marketplace_native_order_id: Set(aggregate.marketplace_native_order_id.clone()),
        order_number: Set(aggregate.order_number.clone()),
        customer_name: Set(aggregate.customer_name.clone()),
        customer_email: Set(aggregate.customer_email.clone()),
        status: Set(aggregate.status.as_str().to_string()),
        total_amount: Set(aggregate.total_amount),
        item_count: Set(aggregate.item_count),
        order_date: Set(Some(aggregate.order_date)),
        tracking_number: Set(aggregate.tracking_number.clone()),
        fulfillment_type: Set(aggregate.fulfillment_type.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &NormalizedOrder) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        tenant_id: Set(aggregate.tenant_id.value().to_string()),
        marketplace_kind: Set(aggregate.marketplace_kind.code().to_string()),
        marketplace_native_order_id: Set(aggregate.marketplace_native_order_id.clone()),
        order_number: Set(aggregate.order_number.clone()),
        customer_name: Set(aggregate.customer_name.clone()),
        customer_email: Set(aggregate.customer_email.clone()),
        status: Set(aggregate.status.as_str().to_string()),
        total_amount: Set(aggregate.total_amount),
        item_count: Set(aggregate.item_count),
        order_date: Set(Some(aggregate.order_date)),
        tracking_number: Set(aggregate.tracking_number.clone()),
        fulfillment_type: Set(aggregate.fulfillment_type.clone()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
