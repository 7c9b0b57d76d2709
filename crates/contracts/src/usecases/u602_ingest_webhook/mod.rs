pub mod response;

pub use response::{WebhookAck, WebhookAckStatus};

use crate::usecases::common::UseCaseMetadata;

pub struct IngestWebhook;

impl UseCaseMetadata for IngestWebhook {
    fn usecase_index() -> &'static str {
        "u602"
    }

    fn usecase_name() -> &'static str {
        "ingest_webhook"
    }

    fn display_name() -> &'static str {
        "Приём webhook-событий"
    }

    fn description() -> &'static str {
        "Проверка, дедупликация и надёжная постановка push-событий в очередь"
    }
}
