pub mod ozon;
pub mod wildberries;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::a001_marketplace_connection::MarketplaceCredentials;
use contracts::domain::a003_normalized_order::OrderStatus;
use contracts::enums::MarketplaceKind;
use once_cell::sync::Lazy;

use crate::shared::error::OrchestratorError;

/// Товар в том виде, в каком его отдаёт API маркетплейса,
/// уже приведённый к общим полям
#[derive(Debug, Clone)]
pub struct RemoteProduct {
    pub native_id: String,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub category: Option<String>,
}

/// Заказ из выгрузки маркетплейса, приведённый к общим полям
#[derive(Debug, Clone)]
pub struct RemoteOrder {
    pub native_order_id: String,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub item_count: i64,
    pub order_date: DateTime<Utc>,
    pub tracking_number: Option<String>,
    pub fulfillment_type: Option<String>,
}

/// Разобранное push-событие маркетплейса
///
/// event_id выдаёт сам маркетплейс; по нему работает дедупликация
/// в приёмнике webhook-ов.
#[derive(Debug, Clone)]
pub enum RemoteOrderEvent {
    /// Новый заказ
    OrderCreated { event_id: String, order: RemoteOrder },

    /// Заказ отменён покупателем или маркетплейсом
    OrderCancelled {
        event_id: String,
        native_order_id: String,
    },

    /// Смена статуса существующего заказа
    StatusChanged {
        event_id: String,
        native_order_id: String,
        status: OrderStatus,
        tracking_number: Option<String>,
    },
}

impl RemoteOrderEvent {
    pub fn event_id(&self) -> &str {
        match self {
            Self::OrderCreated { event_id, .. } => event_id,
            Self::OrderCancelled { event_id, .. } => event_id,
            Self::StatusChanged { event_id, .. } => event_id,
        }
    }

    /// Код типа события для журнала и таблицы очереди
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::StatusChanged { .. } => "status_changed",
        }
    }
}

/// Адаптер одного маркетплейса
///
/// Методы с сетевыми вызовами возвращают сырые ошибки транспорта и API;
/// тайм-ауты и перевод в типизированные ошибки лежат на вызывающей стороне.
/// Проверка подписи webhook-а выполняется приёмником до разбора, поэтому
/// parse_webhook_event получает уже аутентифицированное тело.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    /// Проверка учётных данных лёгким вызовом API
    async fn verify_credentials(&self, credentials: &MarketplaceCredentials)
        -> anyhow::Result<()>;

    /// Полная выгрузка товаров
    async fn list_products(
        &self,
        credentials: &MarketplaceCredentials,
    ) -> anyhow::Result<Vec<RemoteProduct>>;

    /// Выгрузка заказов; since сужает окно до изменённых после этого момента
    async fn list_orders(
        &self,
        credentials: &MarketplaceCredentials,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<RemoteOrder>>;

    /// Разбор тела push-события в нормализованное событие заказа
    fn parse_webhook_event(&self, payload: &[u8]) -> Result<RemoteOrderEvent, OrchestratorError>;
}

static OZON_ADAPTER: Lazy<ozon::OzonAdapter> = Lazy::new(ozon::OzonAdapter::new);
static WILDBERRIES_ADAPTER: Lazy<wildberries::WildberriesAdapter> =
    Lazy::new(wildberries::WildberriesAdapter::new);

/// Адаптер для вида маркетплейса; None — интеграция ещё не реализована
pub fn adapter_for(kind: MarketplaceKind) -> Option<&'static dyn MarketplaceAdapter> {
    match kind {
        MarketplaceKind::Ozon => Some(&*OZON_ADAPTER),
        MarketplaceKind::Wildberries => Some(&*WILDBERRIES_ADAPTER),
        MarketplaceKind::YandexMarket
        | MarketplaceKind::Aliexpress
        | MarketplaceKind::Sber
        | MarketplaceKind::KazanExpress => None,
    }
}

/// Текст ошибки для видов без реализованной интеграции
pub fn unsupported_kind_message(kind: MarketplaceKind) -> String {
    format!("Интеграция с {} пока не реализована", kind.display_name())
}

/// Детализация транспортной ошибки reqwest
pub(crate) fn transport_error(marketplace: &str, e: reqwest::Error) -> anyhow::Error {
    if e.is_timeout() {
        anyhow::anyhow!("Превышено время ожидания ответа от {} API", marketplace)
    } else if e.is_connect() {
        anyhow::anyhow!(
            "Не удалось установить соединение с {} API: {}",
            marketplace,
            e
        )
    } else if e.is_request() {
        anyhow::anyhow!("Ошибка формирования запроса: {}", e)
    } else {
        anyhow::anyhow!("Неизвестная ошибка: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_kinds_have_no_adapter() {
        for kind in [
            MarketplaceKind::YandexMarket,
            MarketplaceKind::Aliexpress,
            MarketplaceKind::Sber,
            MarketplaceKind::KazanExpress,
        ] {
            assert!(adapter_for(kind).is_none());
            assert!(unsupported_kind_message(kind).contains(kind.display_name()));
        }
    }
}
