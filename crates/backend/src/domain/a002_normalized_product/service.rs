use chrono::{DateTime, Utc};
use contracts::domain::a002_normalized_product::{
    NormalizedProduct, NormalizedProductDto, ProductFilter,
};
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;

use super::repository;
use crate::shared::config::get_config;

/// Список товаров арендатора. Порог «мало на складе» берётся из
/// конфигурации, фильтр лишь включает его.
pub async fn list(
    tenant: &TenantId,
    filter: &ProductFilter,
) -> anyhow::Result<Vec<NormalizedProductDto>> {
    let low_stock_below = match filter.low_stock {
        Some(true) => Some(get_config().sync.low_stock_threshold),
        _ => None,
    };
    let items = repository::list(
        tenant,
        filter.kind,
        filter.search.as_deref(),
        low_stock_below,
    )
    .await?;
    Ok(items.iter().map(NormalizedProductDto::from).collect())
}

/// Применить одну запись выгрузки: обновить существующий товар по ключу
/// (tenant, kind, native_id) или завести новый. Возвращает true, если
/// запись создана.
pub async fn upsert_remote(
    tenant: &TenantId,
    kind: MarketplaceKind,
    remote: &crate::shared::marketplaces::RemoteProduct,
    synced_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    match repository::get_by_native(tenant, kind, &remote.native_id).await? {
        Some(mut existing) => {
            existing.apply_remote(
                remote.sku.clone(),
                remote.name.clone(),
                remote.price,
                remote.stock,
                remote.category.clone(),
                synced_at,
            );
            repository::update(&existing).await?;
            Ok(false)
        }
        None => {
            let mut product = NormalizedProduct::new_for_insert(
                *tenant,
                kind,
                remote.native_id.clone(),
                remote.sku.clone(),
                remote.name.clone(),
                remote.price,
                remote.stock,
                remote.category.clone(),
            );
            product.synced_at = synced_at;
            repository::insert(&product).await?;
            Ok(true)
        }
    }
}

/// Пометить устаревшими товары пары, которых не было в полной выгрузке
pub async fn mark_stale_before(
    tenant: &TenantId,
    kind: MarketplaceKind,
    cutoff: DateTime<Utc>,
) -> anyhow::Result<u64> {
    let marked = repository::mark_stale_before(tenant, kind, cutoff).await?;
    if marked > 0 {
        tracing::info!(
            "Marked {} stale products: tenant={} marketplace={}",
            marked,
            tenant.value(),
            kind.code()
        );
    }
    Ok(marked)
}
