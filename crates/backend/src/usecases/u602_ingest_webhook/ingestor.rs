use contracts::domain::common::TenantId;
use contracts::enums::MarketplaceKind;
use contracts::usecases::u602_ingest_webhook::WebhookAck;

use super::{repository, worker};
use crate::shared::credentials;
use crate::shared::crypto;
use crate::shared::error::OrchestratorError;
use crate::shared::logger;
use crate::shared::marketplaces;

/// Принять push-уведомление маркетплейса
///
/// Подпись, разбор, дедупликация, надёжная постановка в очередь.
/// Ответ подтверждает только фиксацию в очереди; применение к заказам
/// выполняет фоновый воркер. Бизнес-отклонения возвращаются как
/// типизированные ошибки, транслировать их в HTTP-статусы решает
/// обработчик.
pub async fn ingest(
    tenant: &TenantId,
    kind: MarketplaceKind,
    body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookAck, OrchestratorError> {
    let creds = credentials::get(tenant, kind)
        .await?
        .ok_or_else(|| {
            OrchestratorError::NotFound(format!(
                "Подключение к {} не настроено",
                kind.display_name()
            ))
        })?;

    let Some(secret) = creds.webhook_secret.as_deref().filter(|s| !s.is_empty()) else {
        logger::log(
            "webhook",
            &format!(
                "Событие {} отклонено: webhook-секрет не задан",
                kind.code()
            ),
        );
        return Err(OrchestratorError::InvalidSignature);
    };

    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        logger::log(
            "webhook",
            &format!("Событие {} отклонено: подпись отсутствует", kind.code()),
        );
        return Err(OrchestratorError::InvalidSignature);
    };

    if !crypto::verify_webhook_signature(secret, body, signature) {
        logger::log(
            "webhook",
            &format!("Событие {} отклонено: неверная подпись", kind.code()),
        );
        return Err(OrchestratorError::InvalidSignature);
    }

    let adapter = marketplaces::adapter_for(kind)
        .ok_or_else(|| OrchestratorError::Adapter(marketplaces::unsupported_kind_message(kind)))?;

    let event = match adapter.parse_webhook_event(body) {
        Ok(event) => event,
        Err(e) => {
            logger::log(
                "webhook",
                &format!("Событие {} отклонено: {}", kind.code(), e),
            );
            return Err(e);
        }
    };

    if repository::exists(tenant, kind, event.event_id()).await? {
        return Ok(WebhookAck::duplicate());
    }

    let payload = String::from_utf8_lossy(body).into_owned();
    repository::enqueue(tenant, kind, event.event_id(), event.event_type(), payload).await?;
    worker::notify();

    logger::log(
        "webhook",
        &format!(
            "Событие {} принято: marketplace={} event_id={}",
            event.event_type(),
            kind.code(),
            event.event_id()
        ),
    );

    Ok(WebhookAck::accepted())
}
