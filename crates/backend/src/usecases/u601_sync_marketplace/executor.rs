use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use contracts::domain::a004_sync_run::SyncRun;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use contracts::usecases::u601_sync_marketplace::{SyncMode, SyncResult};

use crate::domain::{
    a001_marketplace_connection, a002_normalized_product, a003_normalized_order, a004_sync_run,
};
use crate::shared::credentials;
use crate::shared::error::OrchestratorError;
use crate::shared::logger;
use crate::shared::marketplaces::{self, MarketplaceAdapter};
use crate::shared::{config::get_config, sync_gate};

/// Executor синхронизации маркетплейса
///
/// На пару (tenant, kind) одновременно выполняется не больше одного
/// запуска; второй вызов сразу получает SyncInProgress, без очереди.
pub struct SyncExecutor {
    in_flight: Mutex<HashSet<(uuid::Uuid, MarketplaceKind)>>,
}

impl SyncExecutor {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Запустить синхронизацию пары (tenant, kind)
    pub async fn sync(
        &self,
        tenant: &TenantId,
        kind: MarketplaceKind,
        mode: SyncMode,
    ) -> Result<SyncResult, OrchestratorError> {
        let adapter = marketplaces::adapter_for(kind).ok_or_else(|| {
            OrchestratorError::Adapter(marketplaces::unsupported_kind_message(kind))
        })?;
        self.sync_with_adapter(tenant, kind, mode, adapter).await
    }

    /// Тело синхронизации с явным адаптером
    pub async fn sync_with_adapter(
        &self,
        tenant: &TenantId,
        kind: MarketplaceKind,
        mode: SyncMode,
        adapter: &dyn MarketplaceAdapter,
    ) -> Result<SyncResult, OrchestratorError> {
        let _flight = self.enter(tenant, kind)?;

        tracing::info!(
            "Starting marketplace sync: tenant={} marketplace={} mode={:?}",
            tenant.value(),
            kind.code(),
            mode
        );

        // Свежий запуск снимает прошлый запрос на отмену
        let cancel = sync_gate::cancel_flag(tenant, kind);
        cancel.store(false, Ordering::SeqCst);

        let connection = a001_marketplace_connection::repository::get_active(tenant, kind)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!(
                    "Подключение к {} не найдено",
                    kind.display_name()
                ))
            })?;

        let creds = match credentials::get(tenant, kind).await {
            Ok(Some(creds)) => creds,
            Ok(None) => {
                let reason = format!("Учётные данные {} не найдены в хранилище", kind.code());
                a001_marketplace_connection::service::record_sync_failure(tenant, kind, &reason)
                    .await?;
                return Err(OrchestratorError::Connection(reason));
            }
            Err(e) => {
                let reason = format!("Учётные данные {} недоступны: {}", kind.code(), e);
                a001_marketplace_connection::service::record_sync_failure(tenant, kind, &reason)
                    .await?;
                return Err(OrchestratorError::Connection(reason));
            }
        };

        let mut run = SyncRun::started(*tenant, kind);
        a004_sync_run::repository::insert(&run).await?;
        let mut result = SyncResult::default();

        // Шаг выборки: оба вызова адаптера до каких-либо изменений записей
        let products = match self.fetch(adapter.list_products(&creds)).await {
            Ok(products) => products,
            Err(e) => return self.abort(tenant, kind, &mut run, e).await,
        };

        if cancel.load(Ordering::SeqCst) {
            return self.abort_cancelled(&mut run, &result).await;
        }

        let orders = match self
            .fetch(adapter.list_orders(&creds, connection.last_sync_at))
            .await
        {
            Ok(orders) => orders,
            Err(e) => return self.abort(tenant, kind, &mut run, e).await,
        };

        if cancel.load(Ordering::SeqCst) {
            return self.abort_cancelled(&mut run, &result).await;
        }

        // Фаза применения: под тем же затвором, что и webhook-воркер
        let gate = sync_gate::write_gate(tenant, kind);
        let _guard = gate.lock().await;

        let synced_at = Utc::now();
        for product in &products {
            match a002_normalized_product::service::upsert_remote(tenant, kind, product, synced_at)
                .await
            {
                Ok(_) => result.products += 1,
                Err(e) => {
                    tracing::error!("Failed to upsert product {}: {}", product.sku, e);
                    result.errors.push(format!("товар {}: {}", product.sku, e));
                }
            }
        }

        if cancel.load(Ordering::SeqCst) {
            return self.abort_cancelled(&mut run, &result).await;
        }

        // Полная выгрузка: всё, чего в ней не было, становится устаревшим
        let stale =
            a002_normalized_product::service::mark_stale_before(tenant, kind, run.started_at)
                .await?;
        result.products += stale as i64;

        if cancel.load(Ordering::SeqCst) {
            return self.abort_cancelled(&mut run, &result).await;
        }

        let mut customer_emails: HashSet<String> = HashSet::new();
        for order in &orders {
            match a003_normalized_order::service::upsert_remote(tenant, kind, order).await {
                Ok(_) => {
                    result.orders += 1;
                    customer_emails.insert(order.customer_email.clone());
                }
                Err(e) => {
                    tracing::error!("Failed to upsert order {}: {}", order.order_number, e);
                    result
                        .errors
                        .push(format!("заказ {}: {}", order.order_number, e));
                }
            }
        }
        result.customers = customer_emails.len() as i64;

        let run_error = if result.errors.is_empty() {
            None
        } else {
            Some(result.errors.join("; "))
        };
        run.finish(result.products, result.orders, run_error);
        a004_sync_run::repository::update(&run).await?;

        a001_marketplace_connection::service::record_sync_success(tenant, kind, run.started_at)
            .await?;

        logger::log(
            "sync",
            &format!(
                "Синхронизация {} завершена: товары={}, заказы={}, покупатели={}, ошибки={}",
                kind.code(),
                result.products,
                result.orders,
                result.customers,
                result.errors.len()
            ),
        );
        tracing::info!(
            "Marketplace sync completed: tenant={} marketplace={} products={} orders={}",
            tenant.value(),
            kind.code(),
            result.products,
            result.orders
        );

        Ok(result)
    }

    /// Вызов адаптера под ограничением по времени из конфигурации
    async fn fetch<T>(
        &self,
        call: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, OrchestratorError> {
        let timeout_secs = get_config().sync.adapter_timeout_seconds;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OrchestratorError::Adapter(e.to_string())),
            Err(_) => Err(OrchestratorError::AdapterTimeout(timeout_secs)),
        }
    }

    /// Оборвать запуск на шаге выборки: записи не тронуты, подключение
    /// переводится в SyncError с текстом причины
    async fn abort(
        &self,
        tenant: &TenantId,
        kind: MarketplaceKind,
        run: &mut SyncRun,
        error: OrchestratorError,
    ) -> Result<SyncResult, OrchestratorError> {
        let reason = error.to_string();
        run.finish(0, 0, Some(reason.clone()));
        a004_sync_run::repository::update(run).await?;
        a001_marketplace_connection::service::record_sync_failure(tenant, kind, &reason).await?;
        logger::log(
            "sync",
            &format!("Синхронизация {} прервана: {}", kind.code(), reason),
        );
        Err(error)
    }

    /// Кооперативная отмена: запуск фиксируется как отменённый вместе с
    /// уже применёнными счётчиками, состояние подключения не трогаем
    /// (его меняет отключение)
    async fn abort_cancelled(
        &self,
        run: &mut SyncRun,
        applied: &SyncResult,
    ) -> Result<SyncResult, OrchestratorError> {
        run.finish(
            applied.products,
            applied.orders,
            Some("Синхронизация отменена".to_string()),
        );
        a004_sync_run::repository::update(run).await?;
        tracing::info!(
            "Marketplace sync cancelled: tenant={} marketplace={}",
            run.tenant_id.value(),
            run.marketplace_kind.code()
        );
        Err(OrchestratorError::InvalidState(
            "Синхронизация отменена".to_string(),
        ))
    }

    fn enter(
        &self,
        tenant: &TenantId,
        kind: MarketplaceKind,
    ) -> Result<FlightGuard<'_>, OrchestratorError> {
        let key = (tenant.value(), kind);
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !in_flight.insert(key) {
            return Err(OrchestratorError::SyncInProgress(kind.code().to_string()));
        }
        Ok(FlightGuard {
            owner: &self.in_flight,
            key,
        })
    }
}

impl Default for SyncExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Снимает пару с учёта при любом выходе из синхронизации
struct FlightGuard<'a> {
    owner: &'a Mutex<HashSet<(uuid::Uuid, MarketplaceKind)>>,
    key: (uuid::Uuid, MarketplaceKind),
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = match self.owner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.key);
    }
}
