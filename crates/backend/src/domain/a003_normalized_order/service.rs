use contracts::domain::a003_normalized_order::{
    NormalizedOrderDto, OrderFilter, OrderStatus, ShipOrderRequest, UpdateOrderStatusRequest,
};
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use uuid::Uuid;

use super::repository;
use crate::shared::error::OrchestratorError;
use crate::shared::logger;
use crate::shared::marketplaces::{RemoteOrder, RemoteOrderEvent};

/// Список заказов арендатора
pub async fn list(
    tenant: &TenantId,
    filter: &OrderFilter,
) -> anyhow::Result<Vec<NormalizedOrderDto>> {
    let items = repository::list(tenant, filter.kind, filter.status, filter.search.as_deref())
        .await?;
    Ok(items.iter().map(NormalizedOrderDto::from).collect())
}

/// Применить одну запись выгрузки заказов: обновить существующий заказ
/// по ключу (tenant, kind, native_order_id) или завести новый.
/// Статус проходит через защиту от отката, остальные поля обновляются
/// в любом случае. Возвращает true, если запись создана.
pub async fn upsert_remote(
    tenant: &TenantId,
    kind: MarketplaceKind,
    remote: &RemoteOrder,
) -> anyhow::Result<bool> {
    match repository::get_by_native(tenant, kind, &remote.native_order_id).await? {
        Some(mut existing) => {
            if let Err(reason) = existing.try_apply_status(remote.status) {
                logger::log("order", &reason);
            }
            existing.customer_name = remote.customer_name.clone();
            existing.customer_email = remote.customer_email.clone();
            existing.total_amount = remote.total_amount;
            existing.item_count = remote.item_count;
            if remote.tracking_number.is_some() {
                existing.tracking_number = remote.tracking_number.clone();
            }
            existing.base.touch();
            repository::update(&existing).await?;
            Ok(false)
        }
        None => {
            let mut order = contracts::domain::a003_normalized_order::NormalizedOrder::new_for_insert(
                *tenant,
                kind,
                remote.native_order_id.clone(),
                remote.order_number.clone(),
                remote.customer_name.clone(),
                remote.customer_email.clone(),
                remote.status,
                remote.total_amount,
                remote.item_count,
                remote.order_date,
                remote.fulfillment_type.clone(),
            );
            order.tracking_number = remote.tracking_number.clone();
            repository::insert(&order).await?;
            Ok(true)
        }
    }
}

/// Применить распознанное webhook-событие. Возвращает true, если запись
/// была создана или изменена; false, если событие проигнорировано
/// (заказ не найден, повтор статуса или отброшенный откат).
pub async fn apply_event(
    tenant: &TenantId,
    kind: MarketplaceKind,
    event: &RemoteOrderEvent,
) -> anyhow::Result<bool> {
    match event {
        RemoteOrderEvent::OrderCreated { order, .. } => {
            upsert_remote(tenant, kind, order).await?;
            Ok(true)
        }
        RemoteOrderEvent::OrderCancelled {
            native_order_id, ..
        } => {
            apply_status_change(tenant, kind, native_order_id, OrderStatus::Cancelled, &None).await
        }
        RemoteOrderEvent::StatusChanged {
            native_order_id,
            status,
            tracking_number,
            ..
        } => apply_status_change(tenant, kind, native_order_id, *status, tracking_number).await,
    }
}

async fn apply_status_change(
    tenant: &TenantId,
    kind: MarketplaceKind,
    native_order_id: &str,
    status: OrderStatus,
    tracking_number: &Option<String>,
) -> anyhow::Result<bool> {
    let Some(mut order) = repository::get_by_native(tenant, kind, native_order_id).await? else {
        logger::log(
            "webhook",
            &format!(
                "Событие для неизвестного заказа проигнорировано: marketplace={} native_id={}",
                kind.code(),
                native_order_id
            ),
        );
        return Ok(false);
    };

    let status_changed = match order.try_apply_status(status) {
        Ok(changed) => changed,
        Err(reason) => {
            logger::log("webhook", &reason);
            false
        }
    };
    let mut tracking_changed = false;
    if let Some(tracking) = tracking_number {
        if order.tracking_number.as_deref() != Some(tracking.as_str()) {
            order.tracking_number = Some(tracking.clone());
            tracking_changed = true;
        }
    }

    if status_changed || tracking_changed {
        order.base.touch();
        repository::update(&order).await?;
        return Ok(true);
    }
    Ok(false)
}

/// Сменить статус заказа из консоли. Обычная смена проходит через
/// защиту от отката; ручное переопределение снимает её и фиксируется
/// в журнале аудита.
pub async fn update_status(
    tenant: &TenantId,
    order_id: &Uuid,
    request: &UpdateOrderStatusRequest,
) -> Result<NormalizedOrderDto, OrchestratorError> {
    let mut order = repository::get_by_id(tenant, order_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("Заказ {} не найден", order_id)))?;

    if request.manual_override {
        let previous = order.status;
        order.force_status(request.status);
        logger::log(
            "order",
            &format!(
                "Статус заказа {} переопределён вручную: {} -> {}",
                order.order_number, previous, request.status
            ),
        );
    } else {
        order
            .try_apply_status(request.status)
            .map_err(OrchestratorError::InvalidState)?;
    }

    repository::update(&order).await?;
    Ok(NormalizedOrderDto::from(&order))
}

/// Отгрузить заказ: статус Shipped плюс трек-номер
pub async fn ship(
    tenant: &TenantId,
    order_id: &Uuid,
    request: &ShipOrderRequest,
) -> Result<NormalizedOrderDto, OrchestratorError> {
    let tracking = request.tracking_number.trim();
    if tracking.is_empty() {
        return Err(OrchestratorError::Validation(
            "Трек-номер не может быть пустым".to_string(),
        ));
    }

    let mut order = repository::get_by_id(tenant, order_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("Заказ {} не найден", order_id)))?;

    order
        .ship(tracking.to_string())
        .map_err(OrchestratorError::InvalidState)?;

    repository::update(&order).await?;
    logger::log(
        "order",
        &format!(
            "Заказ {} отгружен, трек-номер {}",
            order.order_number, tracking
        ),
    );
    Ok(NormalizedOrderDto::from(&order))
}
