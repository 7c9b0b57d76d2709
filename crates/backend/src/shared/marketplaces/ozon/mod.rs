use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use contracts::domain::a001_marketplace_connection::MarketplaceCredentials;
use contracts::domain::a003_normalized_order::OrderStatus;
use serde::{Deserialize, Serialize};

use super::{transport_error, MarketplaceAdapter, RemoteOrder, RemoteOrderEvent, RemoteProduct};
use crate::shared::error::OrchestratorError;

const BASE_URL: &str = "https://api-seller.ozon.ru";
const PAGE_SIZE: i32 = 100;

/// Адаптер Ozon Seller API
///
/// Товары собираются в два прохода: /v3/product/list отдаёт только пары
/// (product_id, offer_id), детали и остатки добирает /v3/product/info/list.
pub struct OzonAdapter {
    client: reqwest::Client,
}

impl OzonAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn client_id(credentials: &MarketplaceCredentials) -> Result<&str> {
        match credentials.client_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => anyhow::bail!("Для Ozon требуется Client-Id"),
        }
    }

    /// POST с заголовками авторизации Ozon и разбором JSON-ответа
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        credentials: &MarketplaceCredentials,
        body: String,
    ) -> Result<T> {
        let client_id = Self::client_id(credentials)?;
        if credentials.api_key.trim().is_empty() {
            anyhow::bail!("Api-Key не может быть пустым");
        }

        let url = format!("{}{}", BASE_URL, path);
        let response = self
            .client
            .post(&url)
            .header("Client-Id", client_id)
            .header("Api-Key", &credentials.api_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("Ozon", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Ozon API request failed: HTTP {} {}", status.as_u16(), body);
            anyhow::bail!("Ozon API вернул ошибку (HTTP {}): {}", status.as_u16(), body);
        }

        let body = response.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(data) => Ok(data),
            Err(e) => {
                let preview: String = body.chars().take(500).collect();
                tracing::error!("Failed to parse Ozon API response: {}", e);
                anyhow::bail!("Failed to parse Ozon API JSON: {}. Response: {}", e, preview)
            }
        }
    }
}

#[async_trait]
impl MarketplaceAdapter for OzonAdapter {
    async fn verify_credentials(&self, credentials: &MarketplaceCredentials) -> Result<()> {
        // Лёгкий метод API для проверки валидности ключей
        let _: serde_json::Value = self
            .post_json("/v1/roles", credentials, "{}".to_string())
            .await?;
        Ok(())
    }

    async fn list_products(
        &self,
        credentials: &MarketplaceCredentials,
    ) -> Result<Vec<RemoteProduct>> {
        let mut products = Vec::new();
        let mut last_id: Option<String> = None;

        loop {
            let request = OzonProductListRequest {
                filter: Some(OzonProductListFilter {
                    visibility: Some("ALL".to_string()),
                }),
                last_id: last_id.clone().unwrap_or_default(),
                limit: PAGE_SIZE,
            };
            let page: OzonProductListResponse = self
                .post_json(
                    "/v3/product/list",
                    credentials,
                    serde_json::to_string(&request)?,
                )
                .await?;

            let items = page.result.items;
            if items.is_empty() {
                break;
            }
            let batch_size = items.len();

            let product_ids: Vec<i64> = items.iter().map(|item| item.product_id).collect();
            let info: OzonProductInfoResponse = self
                .post_json(
                    "/v3/product/info/list",
                    credentials,
                    serde_json::to_string(&OzonProductInfoRequest {
                        product_id: product_ids,
                    })?,
                )
                .await?;

            for item in info.items {
                products.push(to_remote_product(item));
            }

            // Защита от зацикливания: если last_id не изменился, прекращаем
            let old_last_id = last_id.clone();
            last_id = Some(page.result.last_id.clone());
            if old_last_id.is_some() && old_last_id == last_id {
                tracing::warn!(
                    "Ozon product pagination: last_id did not change, stopping. last_id: {:?}",
                    last_id
                );
                break;
            }
            if batch_size < PAGE_SIZE as usize {
                break;
            }
        }

        Ok(products)
    }

    async fn list_orders(
        &self,
        credentials: &MarketplaceCredentials,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteOrder>> {
        let now = Utc::now();
        let window_start = since.unwrap_or_else(|| now - chrono::Duration::days(90));

        let mut orders = Vec::new();
        let mut offset = 0;

        loop {
            let request = OzonPostingListRequest {
                filter: OzonPostingFilter {
                    since: Some(window_start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    to: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    status: None,
                },
                limit: Some(PAGE_SIZE),
                offset: Some(offset),
            };
            let page: OzonPostingListResponse = self
                .post_json(
                    "/v3/posting/fbs/list",
                    credentials,
                    serde_json::to_string(&request)?,
                )
                .await?;

            let has_next = page.result.has_next;
            for posting in page.result.postings {
                orders.push(to_remote_order(posting));
            }
            if !has_next {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(orders)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<RemoteOrderEvent, OrchestratorError> {
        parse_event(payload)
    }
}

impl Default for OzonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Отображение нативных статусов отправлений Ozon
fn map_posting_status(status: &str) -> Option<OrderStatus> {
    match status {
        "awaiting_packaging" => Some(OrderStatus::New),
        "awaiting_deliver" => Some(OrderStatus::Processing),
        "delivering" => Some(OrderStatus::Shipped),
        "delivered" => Some(OrderStatus::Delivered),
        "cancelled" => Some(OrderStatus::Cancelled),
        "returned" => Some(OrderStatus::Returned),
        _ => None,
    }
}

/// Покупатель в выгрузках Ozon не раскрывается, синтезируем
/// детерминированную пару имя/почта по номеру заказа
fn synthesize_customer(display_id: &str) -> (String, String) {
    (
        format!("Клиент Ozon #{}", display_id),
        format!("ozon_customer_{}@marketplace.com", display_id),
    )
}

fn parse_order_date(created_at: Option<&str>, in_process_at: Option<&str>) -> DateTime<Utc> {
    created_at
        .or(in_process_at)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn to_remote_product(info: OzonProductInfo) -> RemoteProduct {
    let stock = info
        .stocks
        .as_ref()
        .map(|s| {
            s.stocks
                .iter()
                .map(|item| (item.present - item.reserved).max(0) as i64)
                .sum()
        })
        .unwrap_or(0);

    let name = if info.name.trim().is_empty() {
        info.offer_id.clone()
    } else {
        info.name.clone()
    };

    RemoteProduct {
        native_id: info.id.to_string(),
        sku: info.offer_id,
        name,
        price: info.price.parse::<f64>().unwrap_or(0.0),
        stock,
        category: None,
    }
}

fn to_remote_order(posting: OzonPosting) -> RemoteOrder {
    let status = match map_posting_status(&posting.status) {
        Some(status) => status,
        None => {
            tracing::warn!(
                "Unknown Ozon posting status '{}' for {}, treating as new",
                posting.status,
                posting.posting_number
            );
            OrderStatus::New
        }
    };

    let total_amount: f64 = posting
        .products
        .iter()
        .map(|p| p.price.unwrap_or(0.0) * p.quantity as f64)
        .sum();
    let item_count: i64 = posting.products.iter().map(|p| p.quantity as i64).sum();

    let display_id = posting
        .order_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| posting.posting_number.clone());
    let (customer_name, customer_email) = synthesize_customer(&display_id);

    RemoteOrder {
        native_order_id: posting.posting_number.clone(),
        order_number: posting.posting_number,
        customer_name,
        customer_email,
        status,
        total_amount,
        item_count,
        order_date: parse_order_date(posting.created_at.as_deref(), posting.in_process_at.as_deref()),
        tracking_number: posting.tracking_number,
        fulfillment_type: Some("FBS".to_string()),
    }
}

/// Разбор push-уведомления Ozon
///
/// Тело уже аутентифицировано приёмником. Конверт несёт message_type,
/// event_id и объект posting.
fn parse_event(payload: &[u8]) -> Result<RemoteOrderEvent, OrchestratorError> {
    let envelope: OzonWebhookEnvelope = serde_json::from_slice(payload).map_err(|e| {
        OrchestratorError::Validation(format!("Malformed Ozon webhook payload: {}", e))
    })?;

    let event_id = envelope
        .event_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            OrchestratorError::Validation("Ozon webhook payload has no event_id".to_string())
        })?;
    let posting = envelope.posting.ok_or_else(|| {
        OrchestratorError::Validation("Ozon webhook payload has no posting".to_string())
    })?;

    match envelope.message_type.as_str() {
        "TYPE_NEW_POSTING" => {
            let order = webhook_posting_to_order(posting)?;
            Ok(RemoteOrderEvent::OrderCreated { event_id, order })
        }
        "TYPE_POSTING_CANCELLED" => Ok(RemoteOrderEvent::OrderCancelled {
            event_id,
            native_order_id: posting.posting_number,
        }),
        "TYPE_POSTING_STATUS_CHANGED" => {
            let native_status = posting.status.clone().unwrap_or_default();
            let status = map_posting_status(&native_status).ok_or_else(|| {
                OrchestratorError::UnknownEventType(format!(
                    "ozon posting status '{}'",
                    native_status
                ))
            })?;
            Ok(RemoteOrderEvent::StatusChanged {
                event_id,
                native_order_id: posting.posting_number,
                status,
                tracking_number: posting.tracking_number,
            })
        }
        other => Err(OrchestratorError::UnknownEventType(other.to_string())),
    }
}

fn webhook_posting_to_order(posting: OzonWebhookPosting) -> Result<RemoteOrder, OrchestratorError> {
    let native_status = posting.status.clone().unwrap_or_default();
    let status = map_posting_status(&native_status).ok_or_else(|| {
        OrchestratorError::UnknownEventType(format!("ozon posting status '{}'", native_status))
    })?;

    let total_amount: f64 = posting
        .products
        .iter()
        .map(|p| p.price.unwrap_or(0.0) * p.quantity as f64)
        .sum();
    let item_count: i64 = posting.products.iter().map(|p| p.quantity).sum();

    let display_id = posting
        .order_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| posting.posting_number.clone());
    let (customer_name, customer_email) = synthesize_customer(&display_id);

    Ok(RemoteOrder {
        native_order_id: posting.posting_number.clone(),
        order_number: posting.posting_number,
        customer_name,
        customer_email,
        status,
        total_amount,
        item_count,
        order_date: parse_order_date(posting.created_at.as_deref(), posting.in_process_at.as_deref()),
        tracking_number: posting.tracking_number,
        fulfillment_type: Some("FBS".to_string()),
    })
}

// ============================================================================
// Request/Response structures для Ozon Seller API
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<OzonProductListFilter>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_id: String,
    pub limit: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListResponse {
    pub result: OzonProductListResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListResult {
    pub items: Vec<OzonProductListItem>,
    #[serde(default)]
    pub total: i32,
    #[serde(default)]
    pub last_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListItem {
    pub product_id: i64,
    pub offer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductInfoRequest {
    pub product_id: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductInfoResponse {
    // /v3/product/info/list возвращает items напрямую, без обертки result
    pub items: Vec<OzonProductInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductInfo {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub offer_id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub marketing_price: Option<String>,
    #[serde(default)]
    pub stocks: Option<OzonProductStocks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductStocks {
    pub has_stock: Option<bool>,
    #[serde(default)]
    pub stocks: Vec<OzonStockItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonStockItem {
    #[serde(default)]
    pub present: i32,
    #[serde(default)]
    pub reserved: i32,
    #[serde(default)]
    pub sku: i64,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPostingListRequest {
    pub filter: OzonPostingFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPostingFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>, // ISO datetime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>, // ISO datetime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPostingListResponse {
    pub result: OzonPostingListResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPostingListResult {
    #[serde(default)]
    pub postings: Vec<OzonPosting>,
    #[serde(default)]
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPosting {
    pub posting_number: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub in_process_at: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub products: Vec<OzonPostingProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPostingProduct {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub offer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default, deserialize_with = "deserialize_price_option")]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OzonWebhookEnvelope {
    #[serde(default)]
    message_type: String,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    posting: Option<OzonWebhookPosting>,
}

#[derive(Debug, Deserialize)]
struct OzonWebhookPosting {
    posting_number: String,
    #[serde(default)]
    order_id: Option<i64>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    in_process_at: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    products: Vec<OzonWebhookProduct>,
}

#[derive(Debug, Deserialize)]
struct OzonWebhookProduct {
    #[serde(default, deserialize_with = "deserialize_price_option")]
    price: Option<f64>,
    #[serde(default)]
    quantity: i64,
}

/// Десериализует цену из строки или числа в Option<f64>
fn deserialize_price_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Deserialize};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match Option::<StringOrFloat>::deserialize(deserializer)? {
        Some(StringOrFloat::String(s)) => s.parse::<f64>().map(Some).map_err(de::Error::custom),
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_status_mapping() {
        assert_eq!(
            map_posting_status("awaiting_packaging"),
            Some(OrderStatus::New)
        );
        assert_eq!(
            map_posting_status("awaiting_deliver"),
            Some(OrderStatus::Processing)
        );
        assert_eq!(map_posting_status("delivering"), Some(OrderStatus::Shipped));
        assert_eq!(map_posting_status("delivered"), Some(OrderStatus::Delivered));
        assert_eq!(map_posting_status("cancelled"), Some(OrderStatus::Cancelled));
        assert_eq!(map_posting_status("returned"), Some(OrderStatus::Returned));
        assert_eq!(map_posting_status("driver_pickup"), None);
    }

    #[test]
    fn parse_new_posting_event() {
        let payload = br#"{
            "message_type": "TYPE_NEW_POSTING",
            "event_id": "evt-1001",
            "posting": {
                "posting_number": "12345-0001-1",
                "order_id": 77,
                "created_at": "2024-03-01T10:15:00Z",
                "status": "awaiting_packaging",
                "products": [
                    {"price": "1200.50", "quantity": 2},
                    {"price": 99.5, "quantity": 1}
                ]
            }
        }"#;

        let event = parse_event(payload).unwrap();
        match event {
            RemoteOrderEvent::OrderCreated { event_id, order } => {
                assert_eq!(event_id, "evt-1001");
                assert_eq!(order.native_order_id, "12345-0001-1");
                assert_eq!(order.status, OrderStatus::New);
                assert_eq!(order.item_count, 3);
                assert!((order.total_amount - 2500.5).abs() < 1e-9);
                assert_eq!(order.customer_name, "Клиент Ozon #77");
                assert_eq!(order.customer_email, "ozon_customer_77@marketplace.com");
                assert_eq!(order.fulfillment_type.as_deref(), Some("FBS"));
                assert_eq!(
                    order.order_date.to_rfc3339_opts(SecondsFormat::Secs, true),
                    "2024-03-01T10:15:00Z"
                );
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn parse_cancelled_event() {
        let payload = br#"{
            "message_type": "TYPE_POSTING_CANCELLED",
            "event_id": "evt-1002",
            "posting": {"posting_number": "12345-0001-1", "status": "cancelled"}
        }"#;

        match parse_event(payload).unwrap() {
            RemoteOrderEvent::OrderCancelled {
                event_id,
                native_order_id,
            } => {
                assert_eq!(event_id, "evt-1002");
                assert_eq!(native_order_id, "12345-0001-1");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn parse_status_changed_event_with_tracking() {
        let payload = br#"{
            "message_type": "TYPE_POSTING_STATUS_CHANGED",
            "event_id": "evt-1003",
            "posting": {
                "posting_number": "12345-0001-1",
                "status": "delivering",
                "tracking_number": "TRK123"
            }
        }"#;

        match parse_event(payload).unwrap() {
            RemoteOrderEvent::StatusChanged {
                status,
                tracking_number,
                ..
            } => {
                assert_eq!(status, OrderStatus::Shipped);
                assert_eq!(tracking_number.as_deref(), Some("TRK123"));
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let payload = br#"{
            "message_type": "TYPE_CHAT_MESSAGE",
            "event_id": "evt-1004",
            "posting": {"posting_number": "12345-0001-1"}
        }"#;

        match parse_event(payload) {
            Err(OrchestratorError::UnknownEventType(kind)) => {
                assert_eq!(kind, "TYPE_CHAT_MESSAGE");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_native_status_is_rejected() {
        let payload = br#"{
            "message_type": "TYPE_POSTING_STATUS_CHANGED",
            "event_id": "evt-1005",
            "posting": {"posting_number": "12345-0001-1", "status": "driver_pickup"}
        }"#;

        assert!(matches!(
            parse_event(payload),
            Err(OrchestratorError::UnknownEventType(_))
        ));
    }

    #[test]
    fn missing_event_id_is_validation_error() {
        let payload = br#"{
            "message_type": "TYPE_NEW_POSTING",
            "posting": {"posting_number": "12345-0001-1", "status": "awaiting_packaging"}
        }"#;

        assert!(matches!(
            parse_event(payload),
            Err(OrchestratorError::Validation(_))
        ));
    }

    #[test]
    fn malformed_payload_is_validation_error() {
        assert!(matches!(
            parse_event(b"not a json"),
            Err(OrchestratorError::Validation(_))
        ));
    }

    #[test]
    fn sync_posting_maps_to_remote_order() {
        let posting = OzonPosting {
            posting_number: "999-0002-1".into(),
            status: "delivered".into(),
            order_id: Some(42),
            created_at: Some("2024-02-10T08:00:00Z".into()),
            in_process_at: None,
            tracking_number: Some("TRK-42".into()),
            products: vec![OzonPostingProduct {
                product_id: Some(1),
                offer_id: "SKU-1".into(),
                name: "Товар".into(),
                quantity: 3,
                price: Some(100.0),
            }],
        };

        let order = to_remote_order(posting);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.item_count, 3);
        assert!((order.total_amount - 300.0).abs() < 1e-9);
        assert_eq!(order.tracking_number.as_deref(), Some("TRK-42"));
        assert_eq!(order.customer_name, "Клиент Ozon #42");
    }

    #[test]
    fn product_info_maps_stock_and_price() {
        let info = OzonProductInfo {
            id: 501,
            name: "Кружка".into(),
            offer_id: "MUG-01".into(),
            price: "450.00".into(),
            marketing_price: None,
            stocks: Some(OzonProductStocks {
                has_stock: Some(true),
                stocks: vec![
                    OzonStockItem {
                        present: 10,
                        reserved: 3,
                        sku: 1,
                        source: "fbs".into(),
                    },
                    OzonStockItem {
                        present: 5,
                        reserved: 0,
                        sku: 2,
                        source: "fbo".into(),
                    },
                ],
            }),
        };

        let product = to_remote_product(info);
        assert_eq!(product.native_id, "501");
        assert_eq!(product.sku, "MUG-01");
        assert!((product.price - 450.0).abs() < 1e-9);
        assert_eq!(product.stock, 12);
    }
}
