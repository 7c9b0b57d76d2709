use axum::extract::Query;
use axum::http::HeaderMap;
use axum::Json;
use contracts::domain::a002_normalized_product::{NormalizedProductDto, ProductFilter};

use super::tenant_from_headers;
use crate::domain::a002_normalized_product;
use crate::shared::error::OrchestratorError;

/// GET /api/products?kind=&search=&low_stock=
pub async fn list(
    headers: HeaderMap,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<NormalizedProductDto>>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let products = a002_normalized_product::service::list(&tenant, &filter).await?;
    Ok(Json(products))
}
