use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use contracts::domain::a001_marketplace_connection::MarketplaceCredentials;
use contracts::domain::a003_normalized_order::OrderStatus;
use serde::{Deserialize, Serialize};

use super::{transport_error, MarketplaceAdapter, RemoteOrder, RemoteOrderEvent, RemoteProduct};
use crate::shared::error::OrchestratorError;

const ANALYTICS_URL: &str = "https://seller-analytics-api.wildberries.ru";
const STATISTICS_URL: &str = "https://statistics-api.wildberries.ru";

/// Адаптер Wildberries Statistics API
///
/// Товары и заказы берутся из statistics-api: supplier/stocks отдаёт
/// плоские строки остатков (по складам), supplier/orders плоские строки
/// заказов (по позициям).
pub struct WildberriesAdapter {
    client: reqwest::Client,
}

impl WildberriesAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Очистка API ключа от невидимых символов и проверка на ASCII
    fn clean_api_key(credentials: &MarketplaceCredentials) -> Result<String> {
        let api_key = credentials.api_key.trim().replace(['\n', '\r', '\t'], "");
        if api_key.is_empty() {
            anyhow::bail!("API Key не может быть пустым");
        }
        if !api_key.is_ascii() {
            anyhow::bail!("API ключ содержит недопустимые символы");
        }
        Ok(api_key)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        credentials: &MarketplaceCredentials,
        query: &[(&str, String)],
    ) -> Result<T> {
        let api_key = Self::clean_api_key(credentials)?;

        let response = self
            .client
            .get(url)
            .header("Authorization", api_key.as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error("Wildberries", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "Wildberries API request failed: HTTP {} {}",
                status.as_u16(),
                body
            );
            anyhow::bail!(
                "Wildberries API вернул ошибку (HTTP {}): {}",
                status.as_u16(),
                body
            );
        }

        let body = response.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(data) => Ok(data),
            Err(e) => {
                let preview: String = body.chars().take(500).collect();
                tracing::error!("Failed to parse Wildberries API response: {}", e);
                anyhow::bail!(
                    "Failed to parse Wildberries API JSON: {}. Response: {}",
                    e,
                    preview
                )
            }
        }
    }
}

#[async_trait]
impl MarketplaceAdapter for WildberriesAdapter {
    async fn verify_credentials(&self, credentials: &MarketplaceCredentials) -> Result<()> {
        let api_key = Self::clean_api_key(credentials)?;
        let url = format!("{}/ping", ANALYTICS_URL);

        let response = self
            .client
            .get(&url)
            .header("Authorization", api_key.as_str())
            .send()
            .await
            .map_err(|e| transport_error("Wildberries", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Wildberries API вернул ошибку (HTTP {}): {}",
                status.as_u16(),
                body
            );
        }
        Ok(())
    }

    async fn list_products(
        &self,
        credentials: &MarketplaceCredentials,
    ) -> Result<Vec<RemoteProduct>> {
        let url = format!("{}/api/v1/supplier/stocks", STATISTICS_URL);
        // dateFrom обязателен; для полной выгрузки берём заведомо раннюю дату
        let rows: Vec<WbStockRow> = self
            .get_json(&url, credentials, &[("dateFrom", "2019-01-01".to_string())])
            .await?;

        Ok(aggregate_stock_rows(rows))
    }

    async fn list_orders(
        &self,
        credentials: &MarketplaceCredentials,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteOrder>> {
        let window_start = since.unwrap_or_else(|| Utc::now() - chrono::Duration::days(90));
        let url = format!("{}/api/v1/supplier/orders", STATISTICS_URL);
        let rows: Vec<WbOrderRow> = self
            .get_json(
                &url,
                credentials,
                &[
                    ("dateFrom", window_start.format("%Y-%m-%d").to_string()),
                    ("flag", "0".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().filter_map(to_remote_order).collect())
    }

    fn parse_webhook_event(&self, _payload: &[u8]) -> Result<RemoteOrderEvent, OrchestratorError> {
        // Push-уведомления Wildberries не поддерживаются, заказы
        // обновляются только полной синхронизацией
        Err(OrchestratorError::UnknownEventType(
            "wildberries push events are not supported".to_string(),
        ))
    }
}

impl Default for WildberriesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Свернуть строки остатков по складам в товары
///
/// supplier/stocks отдаёт по строке на пару (товар, склад); остатки
/// суммируются, цена и категория берутся из первой встреченной строки.
fn aggregate_stock_rows(rows: Vec<WbStockRow>) -> Vec<RemoteProduct> {
    let mut by_nm_id: BTreeMap<i64, RemoteProduct> = BTreeMap::new();

    for row in rows {
        let Some(nm_id) = row.nm_id else {
            continue;
        };
        let quantity = row.quantity.unwrap_or(0).max(0) as i64;

        match by_nm_id.get_mut(&nm_id) {
            Some(existing) => {
                existing.stock += quantity;
            }
            None => {
                let sku = row
                    .supplier_article
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| nm_id.to_string());
                let name = match (row.brand.as_deref(), row.subject.as_deref()) {
                    (Some(brand), Some(subject)) => format!("{} {}", brand, subject),
                    (None, Some(subject)) => subject.to_string(),
                    _ => sku.clone(),
                };

                by_nm_id.insert(
                    nm_id,
                    RemoteProduct {
                        native_id: nm_id.to_string(),
                        sku,
                        name,
                        price: discounted_price(row.price, row.discount),
                        stock: quantity,
                        category: row.category.clone(),
                    },
                );
            }
        }
    }

    by_nm_id.into_values().collect()
}

/// Цена с учётом скидки продавца (проценты)
fn discounted_price(price: Option<f64>, discount: Option<f64>) -> f64 {
    let price = price.unwrap_or(0.0);
    let discount = discount.unwrap_or(0.0).clamp(0.0, 100.0);
    price * (100.0 - discount) / 100.0
}

/// Покупатель в statistics-api не раскрывается, синтезируем
/// детерминированную пару имя/почта по идентификатору строки заказа
fn synthesize_customer(display_id: &str) -> (String, String) {
    (
        format!("Клиент Wildberries #{}", display_id),
        format!("wb_customer_{}@marketplace.com", display_id),
    )
}

/// Даты statistics-api приходят без зоны ("2024-03-01T10:15:00")
fn parse_wb_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}

fn to_remote_order(row: WbOrderRow) -> Option<RemoteOrder> {
    let native_order_id = row
        .srid
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| row.g_number.clone().filter(|s| !s.trim().is_empty()))?;
    let order_number = row
        .g_number
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| native_order_id.clone());

    let status = if row.is_cancel.unwrap_or(false) {
        OrderStatus::Cancelled
    } else {
        OrderStatus::New
    };

    let (customer_name, customer_email) = synthesize_customer(&native_order_id);

    Some(RemoteOrder {
        native_order_id,
        order_number,
        customer_name,
        customer_email,
        status,
        total_amount: discounted_price(row.total_price, row.discount_percent),
        item_count: 1,
        order_date: parse_wb_date(row.date.as_deref()),
        tracking_number: None,
        fulfillment_type: Some("FBO".to_string()),
    })
}

// ============================================================================
// Response structures для Wildberries Statistics API
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WbStockRow {
    #[serde(rename = "nmId", default)]
    pub nm_id: Option<i64>,
    #[serde(rename = "supplierArticle", default)]
    pub supplier_article: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(rename = "warehouseName", default)]
    pub warehouse_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(rename = "quantityFull", default)]
    pub quantity_full: Option<i32>,
    #[serde(rename = "Price", default)]
    pub price: Option<f64>,
    #[serde(rename = "Discount", default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WbOrderRow {
    #[serde(default)]
    pub srid: Option<String>,
    #[serde(rename = "gNumber", default)]
    pub g_number: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "lastChangeDate", default)]
    pub last_change_date: Option<String>,
    #[serde(rename = "nmId", default)]
    pub nm_id: Option<i64>,
    #[serde(rename = "supplierArticle", default)]
    pub supplier_article: Option<String>,
    #[serde(rename = "totalPrice", default)]
    pub total_price: Option<f64>,
    #[serde(rename = "discountPercent", default)]
    pub discount_percent: Option<f64>,
    #[serde(rename = "isCancel", default)]
    pub is_cancel: Option<bool>,
    #[serde(rename = "cancelDate", default)]
    pub cancel_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_row(nm_id: i64, warehouse: &str, quantity: i32) -> WbStockRow {
        WbStockRow {
            nm_id: Some(nm_id),
            supplier_article: Some("ART-1".into()),
            barcode: None,
            warehouse_name: Some(warehouse.into()),
            quantity: Some(quantity),
            quantity_full: None,
            price: Some(1000.0),
            discount: Some(20.0),
            category: Some("Посуда".into()),
            subject: Some("Кружки".into()),
            brand: Some("Acme".into()),
        }
    }

    #[test]
    fn stock_rows_aggregate_by_nm_id() {
        let rows = vec![
            stock_row(101, "Коледино", 7),
            stock_row(101, "Казань", 5),
            stock_row(202, "Коледино", 1),
        ];

        let products = aggregate_stock_rows(rows);
        assert_eq!(products.len(), 2);

        let first = &products[0];
        assert_eq!(first.native_id, "101");
        assert_eq!(first.stock, 12);
        assert_eq!(first.sku, "ART-1");
        assert_eq!(first.name, "Acme Кружки");
        assert_eq!(first.category.as_deref(), Some("Посуда"));
        assert!((first.price - 800.0).abs() < 1e-9);
    }

    #[test]
    fn rows_without_nm_id_are_skipped() {
        let mut row = stock_row(1, "Коледино", 3);
        row.nm_id = None;
        assert!(aggregate_stock_rows(vec![row]).is_empty());
    }

    #[test]
    fn order_row_maps_to_remote_order() {
        let row = WbOrderRow {
            srid: Some("sr-555".into()),
            g_number: Some("G-100".into()),
            date: Some("2024-03-01T10:15:00".into()),
            last_change_date: None,
            nm_id: Some(101),
            supplier_article: Some("ART-1".into()),
            total_price: Some(1500.0),
            discount_percent: Some(10.0),
            is_cancel: Some(false),
            cancel_date: None,
        };

        let order = to_remote_order(row).unwrap();
        assert_eq!(order.native_order_id, "sr-555");
        assert_eq!(order.order_number, "G-100");
        assert_eq!(order.status, OrderStatus::New);
        assert!((order.total_amount - 1350.0).abs() < 1e-9);
        assert_eq!(order.item_count, 1);
        assert_eq!(order.customer_name, "Клиент Wildberries #sr-555");
        assert_eq!(order.fulfillment_type.as_deref(), Some("FBO"));
        assert_eq!(
            order.order_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2024-03-01T10:15:00"
        );
    }

    #[test]
    fn cancelled_order_row_maps_to_cancelled() {
        let row = WbOrderRow {
            srid: Some("sr-556".into()),
            g_number: None,
            date: Some("2024-03-02T12:00:00".into()),
            last_change_date: None,
            nm_id: None,
            supplier_article: None,
            total_price: Some(500.0),
            discount_percent: None,
            is_cancel: Some(true),
            cancel_date: Some("2024-03-03T09:00:00".into()),
        };

        let order = to_remote_order(row).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.order_number, "sr-556");
    }

    #[test]
    fn order_row_without_ids_is_dropped() {
        let row = WbOrderRow {
            srid: None,
            g_number: Some("  ".into()),
            date: None,
            last_change_date: None,
            nm_id: None,
            supplier_article: None,
            total_price: None,
            discount_percent: None,
            is_cancel: None,
            cancel_date: None,
        };
        assert!(to_remote_order(row).is_none());
    }

    #[test]
    fn webhook_events_are_not_supported() {
        let adapter = WildberriesAdapter::new();
        assert!(matches!(
            adapter.parse_webhook_event(b"{}"),
            Err(OrchestratorError::UnknownEventType(_))
        ));
    }
}
