use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::Json;
use contracts::domain::a003_normalized_order::{
    NormalizedOrderDto, OrderFilter, ShipOrderRequest, UpdateOrderStatusRequest,
};

use super::tenant_from_headers;
use crate::domain::a003_normalized_order;
use crate::shared::error::OrchestratorError;

fn parse_order_id(raw: &str) -> Result<uuid::Uuid, OrchestratorError> {
    uuid::Uuid::parse_str(raw).map_err(|_| {
        OrchestratorError::Validation(format!("Некорректный идентификатор заказа '{}'", raw))
    })
}

/// GET /api/orders?kind=&status=&search=
pub async fn list(
    headers: HeaderMap,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<NormalizedOrderDto>>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let orders = a003_normalized_order::service::list(&tenant, &filter).await?;
    Ok(Json(orders))
}

/// POST /api/orders/:order_id/status
pub async fn update_status(
    headers: HeaderMap,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<NormalizedOrderDto>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let order_id = parse_order_id(&order_id)?;
    let order =
        a003_normalized_order::service::update_status(&tenant, &order_id, &request).await?;
    Ok(Json(order))
}

/// POST /api/orders/:order_id/ship
pub async fn ship(
    headers: HeaderMap,
    Path(order_id): Path<String>,
    Json(request): Json<ShipOrderRequest>,
) -> Result<Json<NormalizedOrderDto>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let order_id = parse_order_id(&order_id)?;
    let order = a003_normalized_order::service::ship(&tenant, &order_id, &request).await?;
    Ok(Json(order))
}
