use axum::extract::Query;
use axum::http::HeaderMap;
use axum::Json;
use contracts::dashboards::d402_analytics::AnalyticsResponse;
use serde::Deserialize;

use super::tenant_from_headers;
use crate::dashboards::d402_analytics;
use crate::shared::error::OrchestratorError;

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

/// GET /api/analytics?period=7d|30d|90d
pub async fn get_analytics(
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let period = query.period.as_deref().unwrap_or("30d");
    let analytics = d402_analytics::service::get_analytics(&tenant, period).await?;
    Ok(Json(analytics))
}
