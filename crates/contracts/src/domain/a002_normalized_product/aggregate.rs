use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin, TenantId,
};
use crate::enums::MarketplaceKind;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор нормализованного товара
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedProductId(pub Uuid);

impl NormalizedProductId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for NormalizedProductId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(NormalizedProductId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Нормализованный товар
///
/// Ключ уникальности: (tenant, marketplace_kind, marketplace_native_id).
/// Один и тот же физический товар, размещённый на двух маркетплейсах,
/// присутствует двумя записями; дедупликация между маркетплейсами
/// намеренно не выполняется. Записи не удаляются: товар, пропавший из
/// полной выгрузки, помечается как устаревший (stale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProduct {
    #[serde(flatten)]
    pub base: BaseAggregate<NormalizedProductId>,

    /// Арендатор-владелец записи
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,

    /// Маркетплейс, с которого получен товар
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,

    /// Внутренний ID товара на маркетплейсе
    #[serde(rename = "marketplaceNativeId")]
    pub marketplace_native_id: String,

    /// Артикул продавца
    pub sku: String,

    /// Цена за единицу
    pub price: f64,

    /// Остаток на складе
    pub stock: i64,

    /// Категория товара
    pub category: Option<String>,

    /// Товар отсутствовал в последней полной выгрузке
    #[serde(rename = "isStale")]
    pub is_stale: bool,

    /// Момент последней синхронизации записи
    #[serde(rename = "syncedAt")]
    pub synced_at: chrono::DateTime<chrono::Utc>,
}

impl NormalizedProduct {
    /// Создать новую запись при первом появлении товара в выгрузке
    pub fn new_for_insert(
        tenant_id: TenantId,
        kind: MarketplaceKind,
        native_id: String,
        sku: String,
        name: String,
        price: f64,
        stock: i64,
        category: Option<String>,
    ) -> Self {
        let base = BaseAggregate::new(NormalizedProductId::new_v4(), sku.clone(), name);

        Self {
            base,
            tenant_id,
            marketplace_kind: kind,
            marketplace_native_id: native_id,
            sku,
            price,
            stock,
            category,
            is_stale: false,
            synced_at: chrono::Utc::now(),
        }
    }

    /// Название товара
    pub fn name(&self) -> &str {
        &self.base.description
    }

    /// Получить ID как строку
    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Применить свежие данные выгрузки: last-write-wins по изменяемым
    /// полям, synced_at всегда двигается вперёд, признак stale снимается
    pub fn apply_remote(
        &mut self,
        sku: String,
        name: String,
        price: f64,
        stock: i64,
        category: Option<String>,
        synced_at: chrono::DateTime<chrono::Utc>,
    ) {
        self.sku = sku.clone();
        self.base.code = sku;
        self.base.description = name;
        self.price = price;
        self.stock = stock;
        self.category = category;
        self.is_stale = false;
        if synced_at > self.synced_at {
            self.synced_at = synced_at;
        }
        self.base.touch();
    }

    /// Пометить запись устаревшей (товар пропал из полной выгрузки)
    pub fn mark_stale(&mut self) {
        self.is_stale = true;
        self.base.touch();
    }
}

impl AggregateRoot for NormalizedProduct {
    type Id = NormalizedProductId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "normalized_product"
    }

    fn element_name() -> &'static str {
        "Товар"
    }

    fn list_name() -> &'static str {
        "Товары"
    }

    fn origin() -> Origin {
        Origin::Marketplace
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO товара для списков UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProductDto {
    pub id: String,
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub category: Option<String>,
    #[serde(rename = "isStale")]
    pub is_stale: bool,
    #[serde(rename = "syncedAt")]
    pub synced_at: chrono::DateTime<chrono::Utc>,
}

impl From<&NormalizedProduct> for NormalizedProductDto {
    fn from(product: &NormalizedProduct) -> Self {
        Self {
            id: product.to_string_id(),
            marketplace_kind: product.marketplace_kind,
            sku: product.sku.clone(),
            name: product.name().to_string(),
            price: product.price,
            stock: product.stock,
            category: product.category.clone(),
            is_stale: product.is_stale,
            synced_at: product.synced_at,
        }
    }
}

/// Фильтр списка товаров
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Только товары конкретного маркетплейса
    pub kind: Option<MarketplaceKind>,
    /// Подстрока в артикуле или названии
    pub search: Option<String>,
    /// Только товары с остатком ниже порога
    #[serde(rename = "lowStock", alias = "low_stock")]
    pub low_stock: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_remote_never_moves_synced_at_backwards() {
        let mut product = NormalizedProduct::new_for_insert(
            TenantId::new_v4(),
            MarketplaceKind::Ozon,
            "p-1".into(),
            "SKU-1".into(),
            "Кружка".into(),
            350.0,
            10,
            None,
        );
        let original = product.synced_at;

        let past = original - chrono::Duration::hours(1);
        product.apply_remote("SKU-1".into(), "Кружка".into(), 360.0, 8, None, past);

        assert_eq!(product.synced_at, original);
        assert_eq!(product.price, 360.0);
        assert_eq!(product.stock, 8);
    }

    #[test]
    fn apply_remote_clears_stale_flag() {
        let mut product = NormalizedProduct::new_for_insert(
            TenantId::new_v4(),
            MarketplaceKind::Wildberries,
            "p-2".into(),
            "SKU-2".into(),
            "Чайник".into(),
            1200.0,
            3,
            Some("Кухня".into()),
        );
        product.mark_stale();
        assert!(product.is_stale);

        product.apply_remote(
            "SKU-2".into(),
            "Чайник".into(),
            1150.0,
            5,
            Some("Кухня".into()),
            chrono::Utc::now(),
        );
        assert!(!product.is_stale);
    }
}
