use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::usecases::common::UseCaseError;
use thiserror::Error;

/// Типизированные ошибки оркестратора синхронизации.
///
/// Каждый вариант соответствует классу ошибки из контракта API и
/// транслируется в HTTP-ответ со структурированным телом.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Sync already in progress for {0}")]
    SyncInProgress(String),

    #[error("Adapter call timed out after {0} seconds")]
    AdapterTimeout(u64),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unknown webhook event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Connection(_) => StatusCode::BAD_GATEWAY,
            Self::SyncInProgress(_) => StatusCode::CONFLICT,
            Self::AdapterTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Adapter(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::UnknownEventType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Тело ответа для клиента. Внутренние ошибки не раскрывают деталей.
    pub fn as_usecase_error(&self) -> UseCaseError {
        match self {
            Self::Validation(msg) => UseCaseError::validation(msg.clone()),
            Self::Connection(msg) => UseCaseError::connection(msg.clone()),
            Self::SyncInProgress(pair) => UseCaseError::sync_in_progress(format!(
                "Sync already in progress for {}",
                pair
            )),
            Self::AdapterTimeout(secs) => UseCaseError::adapter_timeout(format!(
                "Adapter call timed out after {} seconds",
                secs
            )),
            Self::Adapter(msg) => UseCaseError::adapter(msg.clone()),
            Self::InvalidSignature => {
                UseCaseError::invalid_signature("Webhook signature verification failed")
            }
            Self::UnknownEventType(kind) => {
                UseCaseError::unknown_event_type(format!("Unknown event type: {}", kind))
            }
            Self::InvalidState(msg) => UseCaseError::invalid_state(msg.clone()),
            Self::NotFound(what) => UseCaseError::not_found(what.clone()),
            Self::Database(_) | Self::Internal(_) => {
                UseCaseError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:?}", self);
        }
        (status, Json(self.as_usecase_error())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            OrchestratorError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OrchestratorError::SyncInProgress("t/ozon".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            OrchestratorError::AdapterTimeout(30).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            OrchestratorError::NotFound("order".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            OrchestratorError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = OrchestratorError::Internal(anyhow::anyhow!("secret path /etc/creds"));
        let body = err.as_usecase_error();
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("secret"));
    }
}
