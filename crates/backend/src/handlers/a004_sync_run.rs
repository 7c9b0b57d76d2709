use axum::extract::Query;
use axum::http::HeaderMap;
use axum::Json;
use contracts::domain::a004_sync_run::SyncRun;
use contracts::enums::MarketplaceKind;
use serde::Deserialize;

use super::tenant_from_headers;
use crate::domain::a004_sync_run;
use crate::shared::error::OrchestratorError;

#[derive(Deserialize)]
pub struct SyncRunQuery {
    pub kind: Option<MarketplaceKind>,
    pub limit: Option<u64>,
}

/// GET /api/sync-runs?kind=&limit=
pub async fn list(
    headers: HeaderMap,
    Query(query): Query<SyncRunQuery>,
) -> Result<Json<Vec<SyncRun>>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let limit = query.limit.unwrap_or(20).min(100);
    let runs = a004_sync_run::repository::list_recent(&tenant, query.kind, limit).await?;
    Ok(Json(runs))
}
