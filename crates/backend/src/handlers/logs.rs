use axum::extract::Query;
use axum::http::StatusCode;
use axum::Json;
use contracts::shared::logger::LogEntry;
use serde::Deserialize;

use crate::shared::error::OrchestratorError;
use crate::shared::logger;

#[derive(Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
}

/// GET /api/logs?limit=
pub async fn list_all(
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>, OrchestratorError> {
    let logs = logger::repository::get_logs(query.limit).await?;
    Ok(Json(logs))
}

/// DELETE /api/logs
pub async fn clear_all() -> Result<StatusCode, OrchestratorError> {
    logger::repository::clear_all_logs().await?;
    Ok(StatusCode::OK)
}
