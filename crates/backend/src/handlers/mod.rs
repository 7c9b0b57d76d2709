pub mod a001_marketplace_connection;
pub mod a002_normalized_product;
pub mod a003_normalized_order;
pub mod a004_sync_run;
pub mod d401_overview;
pub mod d402_analytics;
pub mod logs;
pub mod usecases;

use axum::http::HeaderMap;
use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;

use crate::shared::error::OrchestratorError;

/// Арендатор запроса из заголовка X-Tenant-Id
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, OrchestratorError> {
    let raw = headers
        .get("X-Tenant-Id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            OrchestratorError::Validation("Заголовок X-Tenant-Id обязателен".to_string())
        })?;
    TenantId::parse(raw.trim()).map_err(OrchestratorError::Validation)
}

/// Вид маркетплейса из сегмента пути
pub fn kind_from_path(code: &str) -> Result<MarketplaceKind, OrchestratorError> {
    MarketplaceKind::from_code(code)
        .ok_or_else(|| OrchestratorError::Validation(format!("Неизвестный маркетплейс '{}'", code)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tenant_header_is_required() {
        let headers = HeaderMap::new();
        assert!(matches!(
            tenant_from_headers(&headers),
            Err(OrchestratorError::Validation(_))
        ));
    }

    #[test]
    fn tenant_header_is_parsed() {
        let tenant = TenantId::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Tenant-Id",
            HeaderValue::from_str(&tenant.value().to_string()).unwrap(),
        );
        assert_eq!(tenant_from_headers(&headers).unwrap(), tenant);
    }

    #[test]
    fn garbage_tenant_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Tenant-Id", HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            tenant_from_headers(&headers),
            Err(OrchestratorError::Validation(_))
        ));
    }

    #[test]
    fn unknown_kind_in_path_is_rejected() {
        assert!(kind_from_path("ozon").is_ok());
        assert!(matches!(
            kind_from_path("ebay"),
            Err(OrchestratorError::Validation(_))
        ));
    }
}
