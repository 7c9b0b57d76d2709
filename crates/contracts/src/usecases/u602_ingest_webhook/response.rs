use serde::{Deserialize, Serialize};

/// Ответ webhook-эндпоинта
///
/// Маркетплейсы агрессивно повторяют доставку при жёстких отказах,
/// поэтому бизнес-отклонения (плохая подпись, незнакомый тип, дубль)
/// подтверждаются кодом 200 с этим телом.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: WebhookAckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAckStatus {
    /// Событие принято и надёжно поставлено в очередь
    Accepted,

    /// Повтор уже принятого события; отброшено молча
    Duplicate,

    /// Событие отклонено (подпись, тип); подробности в message
    Rejected,
}

impl WebhookAck {
    pub fn accepted() -> Self {
        Self {
            status: WebhookAckStatus::Accepted,
            message: "queued".into(),
        }
    }

    pub fn duplicate() -> Self {
        Self {
            status: WebhookAckStatus::Duplicate,
            message: "duplicate event id".into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: WebhookAckStatus::Rejected,
            message: message.into(),
        }
    }
}
