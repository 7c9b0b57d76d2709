use axum::http::HeaderMap;
use axum::Json;
use contracts::dashboards::d401_overview::DashboardOverviewResponse;

use super::tenant_from_headers;
use crate::dashboards::d401_overview;
use crate::shared::error::OrchestratorError;

/// GET /api/dashboard
pub async fn get_dashboard(
    headers: HeaderMap,
) -> Result<Json<DashboardOverviewResponse>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let overview = d401_overview::service::get_overview(&tenant).await?;
    Ok(Json(overview))
}
