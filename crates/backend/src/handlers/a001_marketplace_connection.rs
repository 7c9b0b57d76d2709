use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use contracts::domain::a001_marketplace_connection::{
    MarketplaceConnectionDto, MarketplaceCredentials,
};
use contracts::usecases::u601_sync_marketplace::SyncMode;

use super::{kind_from_path, tenant_from_headers};
use crate::domain::a001_marketplace_connection;
use crate::shared::error::OrchestratorError;
use crate::usecases::u601_sync_marketplace::SYNC_EXECUTOR;

/// GET /api/connections
pub async fn list(
    headers: HeaderMap,
) -> Result<Json<Vec<MarketplaceConnectionDto>>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let connections = a001_marketplace_connection::service::get_connections(&tenant).await?;
    Ok(Json(connections))
}

/// POST /api/connections/:kind/connect
pub async fn connect(
    headers: HeaderMap,
    Path(kind): Path<String>,
    Json(credentials): Json<MarketplaceCredentials>,
) -> Result<Json<MarketplaceConnectionDto>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let kind = kind_from_path(&kind)?;

    let dto = a001_marketplace_connection::service::connect(&tenant, kind, credentials).await?;

    // Первоначальная полная выгрузка уходит в фон, ответ её не ждёт
    tokio::spawn(async move {
        if let Err(e) = SYNC_EXECUTOR.sync(&tenant, kind, SyncMode::Background).await {
            tracing::warn!(
                "Initial sync after connect failed: tenant={} marketplace={} error={}",
                tenant.value(),
                kind.code(),
                e
            );
        }
    });

    Ok(Json(dto))
}

/// POST /api/connections/:kind/disconnect
pub async fn disconnect(
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> Result<StatusCode, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let kind = kind_from_path(&kind)?;
    a001_marketplace_connection::service::disconnect(&tenant, kind).await?;
    Ok(StatusCode::OK)
}
