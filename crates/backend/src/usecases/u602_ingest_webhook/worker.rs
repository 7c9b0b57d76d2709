use std::collections::HashSet;
use std::time::Duration;

use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use once_cell::sync::Lazy;
use tokio::sync::Notify;

use super::repository;
use crate::domain::a003_normalized_order;
use crate::shared::config::get_config;
use crate::shared::marketplaces;
use crate::shared::sync_gate;

static NOTIFY: Lazy<Notify> = Lazy::new(Notify::new);

/// Разбудить воркер после постановки события в очередь
pub fn notify() {
    NOTIFY.notify_one();
}

/// Фоновый цикл применения webhook-событий
///
/// Единственный потребитель очереди: глобальный порядок по id даёт
/// порядок прибытия внутри каждой пары (tenant, kind). Периодический
/// проход подбирает события, оставшиеся в очереди после рестарта.
pub async fn run() {
    tracing::info!("Webhook worker started");
    loop {
        if let Err(e) = drain_queue().await {
            tracing::error!("Webhook queue drain failed: {}", e);
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), NOTIFY.notified()).await;
    }
}

/// Выгрести очередь до пустоты, затем обрезать окна затронутых пар
pub async fn drain_queue() -> anyhow::Result<()> {
    let mut touched: HashSet<(uuid::Uuid, MarketplaceKind)> = HashSet::new();

    loop {
        let batch = repository::list_queued(100).await?;
        if batch.is_empty() {
            break;
        }
        for event in batch {
            if let Some(pair) = process_event(event).await? {
                touched.insert(pair);
            }
        }
    }

    let keep = get_config().sync.webhook_retention;
    for (tenant_uuid, kind) in touched {
        let tenant = TenantId::new(tenant_uuid);
        let pruned = repository::prune_pair(&tenant, kind, keep).await?;
        if pruned > 0 {
            tracing::debug!(
                "Pruned {} webhook events: tenant={} marketplace={}",
                pruned,
                tenant_uuid,
                kind.code()
            );
        }
    }

    Ok(())
}

/// Применить одно событие; возвращает пару для обрезки окна,
/// None — если строка испорчена и пара неизвестна
async fn process_event(
    event: repository::Model,
) -> anyhow::Result<Option<(uuid::Uuid, MarketplaceKind)>> {
    let tenant = match TenantId::parse(&event.tenant_id) {
        Ok(tenant) => tenant,
        Err(e) => {
            repository::mark_failed(event.id, &e).await?;
            return Ok(None);
        }
    };
    let Some(kind) = MarketplaceKind::from_code(&event.marketplace_kind) else {
        repository::mark_failed(
            event.id,
            &format!("Неизвестный маркетплейс: {}", event.marketplace_kind),
        )
        .await?;
        return Ok(None);
    };
    let pair = (tenant.value(), kind);

    let Some(adapter) = marketplaces::adapter_for(kind) else {
        repository::mark_failed(event.id, &marketplaces::unsupported_kind_message(kind)).await?;
        return Ok(Some(pair));
    };

    let parsed = match adapter.parse_webhook_event(event.payload.as_bytes()) {
        Ok(parsed) => parsed,
        Err(e) => {
            repository::mark_failed(event.id, &e.to_string()).await?;
            return Ok(Some(pair));
        }
    };

    // Применение под тем же затвором, что и фаза применения синхронизации
    let gate = sync_gate::write_gate(&tenant, kind);
    let _guard = gate.lock().await;

    match a003_normalized_order::service::apply_event(&tenant, kind, &parsed).await {
        Ok(applied) => {
            repository::mark_processed(event.id).await?;
            tracing::debug!(
                "Webhook event {} processed: applied={} marketplace={}",
                event.event_id,
                applied,
                kind.code()
            );
        }
        Err(e) => {
            tracing::error!("Failed to apply webhook event {}: {}", event.event_id, e);
            repository::mark_failed(event.id, &e.to_string()).await?;
        }
    }

    Ok(Some(pair))
}
