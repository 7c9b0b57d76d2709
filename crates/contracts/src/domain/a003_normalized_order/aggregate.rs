use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin, TenantId,
};
use crate::enums::MarketplaceKind;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор нормализованного заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedOrderId(pub Uuid);

impl NormalizedOrderId {
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

impl AggregateId for NormalizedOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(NormalizedOrderId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Статус заказа
///
/// Жизненный цикл монотонный: `New < Processing < Shipped < Delivered`.
/// `Cancelled` и `Returned` терминальны, выход из них возможен только
/// явным ручным переопределением. Откат назад (например, Delivered -> New
/// от повторно доставленного webhook) отбрасывается, не применяется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "new" => Some(Self::New),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }

    /// Позиция в жизненном цикле; None для терминальных статусов
    pub fn lifecycle_rank(&self) -> Option<u8> {
        match self {
            Self::New => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled | Self::Returned => None,
        }
    }

    /// Терминальный статус (отменён или возвращён)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Допустимо ли обновление статуса `self -> next` без ручного
    /// переопределения. Повтор того же статуса допустим (идемпотентность
    /// доставки событий).
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if next.is_terminal() {
            return true;
        }
        // Оба статуса в линейной части цикла: только вперёд
        match (self.lifecycle_rank(), next.lifecycle_rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Нормализованный заказ
///
/// Ключ уникальности: (tenant, marketplace_kind, marketplace_native_order_id).
/// Создаётся при первом появлении (синхронизация или webhook), никогда не
/// удаляется.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<NormalizedOrderId>,

    /// Арендатор-владелец записи
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,

    /// Маркетплейс-источник заказа
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,

    /// Внутренний ID заказа на маркетплейсе
    #[serde(rename = "marketplaceNativeOrderId")]
    pub marketplace_native_order_id: String,

    /// Номер заказа для отображения
    #[serde(rename = "orderNumber")]
    pub order_number: String,

    /// Имя покупателя
    #[serde(rename = "customerName")]
    pub customer_name: String,

    /// E-mail покупателя
    #[serde(rename = "customerEmail")]
    pub customer_email: String,

    /// Текущий статус заказа
    pub status: OrderStatus,

    /// Сумма заказа
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,

    /// Количество позиций
    #[serde(rename = "itemCount")]
    pub item_count: i64,

    /// Дата заказа
    #[serde(rename = "orderDate")]
    pub order_date: chrono::DateTime<chrono::Utc>,

    /// Трек-номер отправления
    #[serde(rename = "trackingNumber")]
    pub tracking_number: Option<String>,

    /// Схема исполнения (FBS, FBO и т.п.)
    #[serde(rename = "fulfillmentType")]
    pub fulfillment_type: Option<String>,
}

impl NormalizedOrder {
    /// Создать новую запись при первом появлении заказа
    #[allow(clippy::too_many_arguments)]
    pub fn new_for_insert(
        tenant_id: TenantId,
        kind: MarketplaceKind,
        native_order_id: String,
        order_number: String,
        customer_name: String,
        customer_email: String,
        status: OrderStatus,
        total_amount: f64,
        item_count: i64,
        order_date: chrono::DateTime<chrono::Utc>,
        fulfillment_type: Option<String>,
    ) -> Self {
        let base = BaseAggregate::new(
            NormalizedOrderId::new_v4(),
            order_number.clone(),
            format!("Заказ {}", order_number),
        );

        Self {
            base,
            tenant_id,
            marketplace_kind: kind,
            marketplace_native_order_id: native_order_id,
            order_number,
            customer_name,
            customer_email,
            status,
            total_amount,
            item_count,
            order_date,
            tracking_number: None,
            fulfillment_type,
        }
    }

    /// Получить ID как строку
    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Применить новый статус под защитой от отката.
    ///
    /// Ok(true) — статус изменён, Ok(false) — повтор текущего статуса
    /// (ничего не делаем), Err — откат отброшен, причина в тексте.
    pub fn try_apply_status(&mut self, next: OrderStatus) -> Result<bool, String> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Откат статуса заказа {} отброшен: {} -> {}",
                self.order_number, self.status, next
            ));
        }
        self.status = next;
        self.base.touch();
        Ok(true)
    }

    /// Ручное переопределение статуса без защиты от отката.
    /// Единственный способ вывести заказ из терминального состояния.
    pub fn force_status(&mut self, next: OrderStatus) {
        self.status = next;
        self.base.touch();
    }

    /// Отметить отгрузку: статус Shipped плюс трек-номер.
    /// Для терминальных и уже доставленных заказов отгрузка невозможна.
    pub fn ship(&mut self, tracking_number: String) -> Result<(), String> {
        if self.status.is_terminal() || self.status == OrderStatus::Delivered {
            return Err(format!(
                "Заказ {} в статусе {} нельзя отгрузить",
                self.order_number, self.status
            ));
        }
        self.status = OrderStatus::Shipped;
        self.tracking_number = Some(tracking_number);
        self.base.touch();
        Ok(())
    }
}

impl AggregateRoot for NormalizedOrder {
    type Id = NormalizedOrderId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "normalized_order"
    }

    fn element_name() -> &'static str {
        "Заказ"
    }

    fn list_name() -> &'static str {
        "Заказы"
    }

    fn origin() -> Origin {
        Origin::Marketplace
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO заказа для списков UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOrderDto {
    pub id: String,
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerEmail")]
    pub customer_email: String,
    pub status: OrderStatus,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    #[serde(rename = "itemCount")]
    pub item_count: i64,
    #[serde(rename = "orderDate")]
    pub order_date: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "trackingNumber")]
    pub tracking_number: Option<String>,
    #[serde(rename = "fulfillmentType")]
    pub fulfillment_type: Option<String>,
}

impl From<&NormalizedOrder> for NormalizedOrderDto {
    fn from(order: &NormalizedOrder) -> Self {
        Self {
            id: order.to_string_id(),
            marketplace_kind: order.marketplace_kind,
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            status: order.status,
            total_amount: order.total_amount,
            item_count: order.item_count,
            order_date: order.order_date,
            tracking_number: order.tracking_number.clone(),
            fulfillment_type: order.fulfillment_type.clone(),
        }
    }
}

/// Фильтр списка заказов
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Только заказы конкретного маркетплейса
    pub kind: Option<MarketplaceKind>,
    /// Только заказы в конкретном статусе
    pub status: Option<OrderStatus>,
    /// Подстрока в номере заказа или имени покупателя
    pub search: Option<String>,
}

/// Запрос смены статуса заказа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    /// Ручное переопределение: разрешает выход из терминального статуса
    #[serde(default, rename = "manualOverride")]
    pub manual_override: bool,
}

/// Запрос отгрузки заказа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipOrderRequest {
    #[serde(rename = "trackingNumber")]
    pub tracking_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> NormalizedOrder {
        let mut order = NormalizedOrder::new_for_insert(
            TenantId::new_v4(),
            MarketplaceKind::Ozon,
            "1001".into(),
            "ORD-1001".into(),
            "Иван Петров".into(),
            "ivan@example.com".into(),
            OrderStatus::New,
            2500.0,
            2,
            chrono::Utc::now(),
            Some("FBS".into()),
        );
        order.force_status(status);
        order
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        use OrderStatus::*;
        assert!(New.can_transition_to(Processing));
        assert!(New.can_transition_to(Shipped));
        assert!(Processing.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(New));
        assert!(!Shipped.can_transition_to(Processing));
    }

    #[test]
    fn terminal_statuses_cannot_be_left() {
        use OrderStatus::*;
        for terminal in [Cancelled, Returned] {
            for next in [New, Processing, Shipped, Delivered] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        // но повтор того же статуса допустим
        assert!(Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn any_live_status_can_be_cancelled_or_returned() {
        use OrderStatus::*;
        for live in [New, Processing, Shipped, Delivered] {
            assert!(live.can_transition_to(Cancelled));
            assert!(live.can_transition_to(Returned));
        }
    }

    #[test]
    fn regression_is_rejected_and_leaves_status_unchanged() {
        let mut ord = order(OrderStatus::Delivered);
        let result = ord.try_apply_status(OrderStatus::Processing);
        assert!(result.is_err());
        assert_eq!(ord.status, OrderStatus::Delivered);
    }

    #[test]
    fn reapplying_same_status_is_a_noop() {
        let mut ord = order(OrderStatus::Shipped);
        assert_eq!(ord.try_apply_status(OrderStatus::Shipped), Ok(false));
        assert_eq!(ord.status, OrderStatus::Shipped);
    }

    #[test]
    fn force_status_overrides_terminal_state() {
        let mut ord = order(OrderStatus::Cancelled);
        assert!(ord.try_apply_status(OrderStatus::Processing).is_err());
        ord.force_status(OrderStatus::Processing);
        assert_eq!(ord.status, OrderStatus::Processing);
    }

    #[test]
    fn ship_sets_status_and_tracking() {
        let mut ord = order(OrderStatus::Processing);
        ord.ship("TRK123".into()).unwrap();
        assert_eq!(ord.status, OrderStatus::Shipped);
        assert_eq!(ord.tracking_number.as_deref(), Some("TRK123"));
    }

    #[test]
    fn ship_fails_for_terminal_and_delivered() {
        for status in [
            OrderStatus::Cancelled,
            OrderStatus::Returned,
            OrderStatus::Delivered,
        ] {
            let mut ord = order(status);
            assert!(ord.ship("TRK123".into()).is_err());
            assert_eq!(ord.status, status);
            assert!(ord.tracking_number.is_none());
        }
    }

    #[test]
    fn status_codes_round_trip() {
        use OrderStatus::*;
        for status in [New, Processing, Shipped, Delivered, Cancelled, Returned] {
            assert_eq!(OrderStatus::from_code(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_code("packed"), None);
    }
}
