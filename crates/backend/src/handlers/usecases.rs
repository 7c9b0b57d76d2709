use axum::body::Bytes;
use axum::extract::Path;
use axum::http::HeaderMap;
use axum::Json;
use contracts::usecases::u601_sync_marketplace::{SyncRequest, SyncResult};
use contracts::usecases::u602_ingest_webhook::WebhookAck;

use super::{kind_from_path, tenant_from_headers};
use crate::shared::error::OrchestratorError;
use crate::usecases::u601_sync_marketplace::SYNC_EXECUTOR;
use crate::usecases::u602_ingest_webhook::ingestor;

/// POST /api/connections/:kind/sync
///
/// Тело опционально; без него запуск считается интерактивным.
pub async fn u601_sync(
    headers: HeaderMap,
    Path(kind): Path<String>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResult>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let kind = kind_from_path(&kind)?;
    let mode = body.map(|Json(request)| request.mode).unwrap_or_default();

    let result = SYNC_EXECUTOR.sync(&tenant, kind, mode).await?;
    Ok(Json(result))
}

/// POST /api/webhooks/:kind
///
/// Подпись приходит в заголовке X-Webhook-Signature. Отклонения по
/// подписи и типу события подтверждаются кодом 200 с телом rejected,
/// иначе маркетплейс будет повторять доставку.
pub async fn u602_webhook(
    headers: HeaderMap,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Json<WebhookAck>, OrchestratorError> {
    let tenant = tenant_from_headers(&headers)?;
    let kind = kind_from_path(&kind)?;
    let signature = headers
        .get("X-Webhook-Signature")
        .and_then(|value| value.to_str().ok());

    match ingestor::ingest(&tenant, kind, &body, signature).await {
        Ok(ack) => Ok(Json(ack)),
        Err(e @ OrchestratorError::InvalidSignature)
        | Err(e @ OrchestratorError::UnknownEventType(_)) => {
            Ok(Json(WebhookAck::rejected(e.to_string())))
        }
        Err(e) => Err(e),
    }
}
