//! Сквозные сценарии оркестратора на общей тестовой БД.
//!
//! Глобальные ресурсы (конфигурация, БД, ключ шифрования) инициализируются
//! один раз на процесс; изоляция тестов достигается отдельным tenant_id
//! в каждом сценарии.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use contracts::domain::a001_marketplace_connection::{
    ConnectionState, MarketplaceConnection, MarketplaceCredentials,
};
use contracts::domain::a003_normalized_order::{OrderFilter, OrderStatus};
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use contracts::usecases::u601_sync_marketplace::SyncMode;
use contracts::usecases::u602_ingest_webhook::WebhookAckStatus;

use crate::dashboards::{d401_overview, d402_analytics};
use crate::domain::{a001_marketplace_connection, a003_normalized_order, a004_sync_run};
use crate::shared::error::OrchestratorError;
use crate::shared::marketplaces::{
    MarketplaceAdapter, RemoteOrder, RemoteOrderEvent, RemoteProduct,
};
use crate::shared::{config, credentials, crypto, data::db};
use crate::usecases::u601_sync_marketplace::SYNC_EXECUTOR;
use crate::usecases::u602_ingest_webhook::{ingestor, worker};

const WEBHOOK_SECRET: &str = "wh-secret";

static TEST_ENV: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

async fn init_test_env() {
    TEST_ENV
        .get_or_init(|| async {
            let test_config: config::Config =
                toml::from_str("[database]\npath = \"target/test/orchestrator.db\"\n")
                    .expect("test config");
            let _ = crypto::initialize_credential_key(None);
            let _ = config::initialize_config(test_config);

            let db_path = "target/test/orchestrator.db";
            let _ = std::fs::remove_file(db_path);
            db::initialize_database(Some(db_path))
                .await
                .expect("test database");
        })
        .await;
}

/// Подключённая пара с учётными данными в хранилище, минуя сетевое
/// рукопожатие
async fn seed_connected_pair(tenant: &TenantId, kind: MarketplaceKind) {
    let mut connection = MarketplaceConnection::new_for_connect(*tenant, kind);
    connection
        .transition_to(ConnectionState::Connecting)
        .unwrap();
    connection
        .transition_to(ConnectionState::Connected)
        .unwrap();

    let creds = MarketplaceCredentials {
        api_key: "test-api-key".to_string(),
        client_id: Some("12345".to_string()),
        seller_id: None,
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    };
    let credential_ref = credentials::put(tenant, kind, &creds).await.unwrap();
    connection.credential_ref = Some(credential_ref);

    a001_marketplace_connection::repository::insert(&connection)
        .await
        .unwrap();
}

struct StubAdapter {
    products: Vec<RemoteProduct>,
    orders: Vec<RemoteOrder>,
    delay: Option<std::time::Duration>,
}

#[async_trait]
impl MarketplaceAdapter for StubAdapter {
    async fn verify_credentials(
        &self,
        _credentials: &MarketplaceCredentials,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list_products(
        &self,
        _credentials: &MarketplaceCredentials,
    ) -> anyhow::Result<Vec<RemoteProduct>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.products.clone())
    }

    async fn list_orders(
        &self,
        _credentials: &MarketplaceCredentials,
        _since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<RemoteOrder>> {
        Ok(self.orders.clone())
    }

    fn parse_webhook_event(&self, _payload: &[u8]) -> Result<RemoteOrderEvent, OrchestratorError> {
        Err(OrchestratorError::UnknownEventType("stub".to_string()))
    }
}

fn product(native_id: &str, sku: &str, name: &str, price: f64, stock: i64) -> RemoteProduct {
    RemoteProduct {
        native_id: native_id.to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        price,
        stock,
        category: None,
    }
}

fn order(
    native_order_id: &str,
    status: OrderStatus,
    total_amount: f64,
    item_count: i64,
    days_ago: i64,
) -> RemoteOrder {
    RemoteOrder {
        native_order_id: native_order_id.to_string(),
        order_number: native_order_id.to_string(),
        customer_name: format!("Клиент {}", native_order_id),
        customer_email: format!("customer_{}@marketplace.com", native_order_id),
        status,
        total_amount,
        item_count,
        order_date: Utc::now() - Duration::days(days_ago),
        tracking_number: None,
        fulfillment_type: Some("FBS".to_string()),
    }
}

fn stub_with_catalog() -> StubAdapter {
    StubAdapter {
        products: vec![
            product("101", "SKU-A", "Кружка синяя", 450.0, 5),
            product("102", "SKU-B", "Кружка красная", 450.0, 50),
            product("103", "SKU-C", "Термос стальной", 1900.0, 100),
        ],
        orders: vec![
            order("57195475-0050-1", OrderStatus::New, 1200.0, 2, 1),
            order("57195475-0051-1", OrderStatus::Processing, 300.0, 1, 2),
        ],
        delay: None,
    }
}

fn status_changed_payload(event_id: &str, posting_number: &str, status: &str) -> Vec<u8> {
    format!(
        r#"{{
            "message_type": "TYPE_POSTING_STATUS_CHANGED",
            "event_id": "{}",
            "posting": {{
                "posting_number": "{}",
                "status": "{}",
                "tracking_number": "TRK123"
            }}
        }}"#,
        event_id, posting_number, status
    )
    .into_bytes()
}

#[tokio::test]
async fn full_sync_webhook_and_dashboard_flow() {
    init_test_env().await;
    let tenant = TenantId::new_v4();
    let kind = MarketplaceKind::Ozon;
    seed_connected_pair(&tenant, kind).await;

    // Синхронизация через подставной адаптер: 3 товара, 2 заказа
    let stub = stub_with_catalog();
    let result = SYNC_EXECUTOR
        .sync_with_adapter(&tenant, kind, SyncMode::Interactive, &stub)
        .await
        .unwrap();
    assert_eq!(result.products, 3);
    assert_eq!(result.orders, 2);
    assert_eq!(result.customers, 2);
    assert!(!result.has_errors());

    // Подключение зафиксировало успешный запуск
    let connection = a001_marketplace_connection::repository::get_active(&tenant, kind)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(connection.state, ConnectionState::Connected);
    assert!(connection.last_sync_at.is_some());

    // История запусков
    let runs = a004_sync_run::repository::list_recent(&tenant, Some(kind), 10)
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].finished_at.is_some());
    assert_eq!(runs[0].products_touched, 3);
    assert_eq!(runs[0].orders_touched, 2);
    assert!(runs[0].error.is_none());

    // Главный дашборд
    let overview = d401_overview::service::get_overview(&tenant).await.unwrap();
    assert_eq!(overview.stats.connected_marketplaces, 1);
    assert_eq!(overview.stats.total_products, 3);
    assert_eq!(overview.stats.total_orders, 2);
    assert!((overview.stats.total_revenue - 1500.0).abs() < 1e-6);
    assert_eq!(overview.recent_orders.len(), 2);
    assert_eq!(overview.low_stock_products.len(), 1);
    assert_eq!(overview.low_stock_products[0].sku, "SKU-A");

    // Аналитика за неделю
    let analytics = d402_analytics::service::get_analytics(&tenant, "7d")
        .await
        .unwrap();
    assert_eq!(analytics.summary.total_orders, 2);
    assert!((analytics.summary.total_revenue - 1500.0).abs() < 1e-6);
    assert!((analytics.summary.avg_order_value - 750.0).abs() < 1e-6);
    assert_eq!(analytics.summary.active_marketplaces, 1);
    assert_eq!(analytics.daily.len(), 7);
    assert_eq!(analytics.funnel[0].count, 2);

    // Webhook переводит заказ в Shipped с трек-номером
    let payload = status_changed_payload("evt-ship-1", "57195475-0050-1", "delivering");
    let signature = crypto::compute_webhook_signature(WEBHOOK_SECRET, &payload);
    let ack = ingestor::ingest(&tenant, kind, &payload, Some(&signature))
        .await
        .unwrap();
    assert_eq!(ack.status, WebhookAckStatus::Accepted);
    worker::drain_queue().await.unwrap();

    let orders = a003_normalized_order::service::list(&tenant, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);
    let shipped = orders
        .iter()
        .find(|o| o.order_number == "57195475-0050-1")
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRK123"));

    // Повтор того же event_id отбрасывается без изменений
    let ack = ingestor::ingest(&tenant, kind, &payload, Some(&signature))
        .await
        .unwrap();
    assert_eq!(ack.status, WebhookAckStatus::Duplicate);
    worker::drain_queue().await.unwrap();

    let orders = a003_normalized_order::service::list(&tenant, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);
    let shipped = orders
        .iter()
        .find(|o| o.order_number == "57195475-0050-1")
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    // Откат статуса (Shipped -> Processing) игнорируется
    let regress = status_changed_payload("evt-regress-1", "57195475-0050-1", "awaiting_deliver");
    let signature = crypto::compute_webhook_signature(WEBHOOK_SECRET, &regress);
    let ack = ingestor::ingest(&tenant, kind, &regress, Some(&signature))
        .await
        .unwrap();
    assert_eq!(ack.status, WebhookAckStatus::Accepted);
    worker::drain_queue().await.unwrap();

    let orders = a003_normalized_order::service::list(&tenant, &OrderFilter::default())
        .await
        .unwrap();
    let still_shipped = orders
        .iter()
        .find(|o| o.order_number == "57195475-0050-1")
        .unwrap();
    assert_eq!(still_shipped.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected_and_not_queued() {
    init_test_env().await;
    let tenant = TenantId::new_v4();
    let kind = MarketplaceKind::Ozon;
    seed_connected_pair(&tenant, kind).await;

    let payload = status_changed_payload("evt-forged-1", "57195475-0070-1", "delivering");
    let result = ingestor::ingest(&tenant, kind, &payload, Some("sha256=deadbeef")).await;
    assert!(matches!(result, Err(OrchestratorError::InvalidSignature)));

    let result = ingestor::ingest(&tenant, kind, &payload, None).await;
    assert!(matches!(result, Err(OrchestratorError::InvalidSignature)));
}

#[tokio::test]
async fn concurrent_syncs_for_one_pair_run_exactly_once() {
    init_test_env().await;
    let tenant = TenantId::new_v4();
    let kind = MarketplaceKind::Ozon;
    seed_connected_pair(&tenant, kind).await;

    let slow = StubAdapter {
        products: vec![product("201", "SKU-S", "Товар", 100.0, 10)],
        orders: vec![],
        delay: Some(std::time::Duration::from_millis(200)),
    };
    let fast = StubAdapter {
        products: vec![],
        orders: vec![],
        delay: None,
    };

    let (first, second) = tokio::join!(
        SYNC_EXECUTOR.sync_with_adapter(&tenant, kind, SyncMode::Interactive, &slow),
        SYNC_EXECUTOR.sync_with_adapter(&tenant, kind, SyncMode::Background, &fast),
    );

    let results = [first, second];
    let completed = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(OrchestratorError::SyncInProgress(_))))
        .count();
    assert_eq!(completed, 1);
    assert_eq!(rejected, 1);
}

#[tokio::test]
async fn dashboard_is_all_zeros_for_empty_tenant() {
    init_test_env().await;
    let tenant = TenantId::new_v4();

    let overview = d401_overview::service::get_overview(&tenant).await.unwrap();
    assert_eq!(
        overview.stats.total_marketplaces,
        MarketplaceKind::all().len() as i64
    );
    assert_eq!(overview.stats.connected_marketplaces, 0);
    assert_eq!(overview.stats.total_products, 0);
    assert_eq!(overview.stats.total_orders, 0);
    assert_eq!(overview.stats.total_revenue, 0.0);
    assert!(overview.recent_orders.is_empty());
    assert!(overview.low_stock_products.is_empty());
}

#[tokio::test]
async fn disconnect_wipes_credentials_and_allows_reconnect() {
    init_test_env().await;
    let tenant = TenantId::new_v4();
    let kind = MarketplaceKind::Wildberries;
    seed_connected_pair(&tenant, kind).await;

    a001_marketplace_connection::service::disconnect(&tenant, kind)
        .await
        .unwrap();

    assert!(credentials::get(&tenant, kind).await.unwrap().is_none());
    assert!(
        a001_marketplace_connection::repository::get_active(&tenant, kind)
            .await
            .unwrap()
            .is_none()
    );

    // Повторное отключение идемпотентно
    a001_marketplace_connection::service::disconnect(&tenant, kind)
        .await
        .unwrap();

    // Новое подключение даёт чистую пару
    seed_connected_pair(&tenant, kind).await;
    let connection = a001_marketplace_connection::repository::get_active(&tenant, kind)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(connection.state, ConnectionState::Connected);
    assert!(connection.last_sync_at.is_none());
    assert!(credentials::get(&tenant, kind).await.unwrap().is_some());
}
