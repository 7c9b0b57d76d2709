use chrono::Utc;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "credential_vault")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tenant_id: String,
    pub marketplace_kind: String,
    pub payload: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Сохранить шифртекст для пары (tenant, kind), заменяя прежнюю запись.
/// Возвращает новый credential_ref.
pub async fn replace(
    tenant: &TenantId,
    kind: MarketplaceKind,
    ciphertext: String,
) -> anyhow::Result<Uuid> {
    Entity::delete_many()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .exec(conn())
        .await?;

    let credential_ref = Uuid::new_v4();
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(credential_ref.to_string()),
        tenant_id: Set(tenant.value().to_string()),
        marketplace_kind: Set(kind.code().to_string()),
        payload: Set(ciphertext),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
    };
    active.insert(conn()).await?;
    Ok(credential_ref)
}

pub async fn get_ciphertext(
    tenant: &TenantId,
    kind: MarketplaceKind,
) -> anyhow::Result<Option<String>> {
    let row = Entity::find()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .one(conn())
        .await?;
    Ok(row.map(|m| m.payload))
}

/// Удалить запись пары. Возвращает true, если что-то было удалено.
pub async fn delete(tenant: &TenantId, kind: MarketplaceKind) -> anyhow::Result<bool> {
    let result = Entity::delete_many()
        .filter(Column::TenantId.eq(tenant.value().to_string()))
        .filter(Column::MarketplaceKind.eq(kind.code()))
        .exec(conn())
        .await?;
    Ok(result.rows_affected > 0)
}
