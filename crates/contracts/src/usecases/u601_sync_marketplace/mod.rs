pub mod request;
pub mod response;

pub use request::{SyncMode, SyncRequest};
pub use response::SyncResult;

use crate::usecases::common::UseCaseMetadata;

pub struct SyncMarketplace;

impl UseCaseMetadata for SyncMarketplace {
    fn usecase_index() -> &'static str {
        "u601"
    }

    fn usecase_name() -> &'static str {
        "sync_marketplace"
    }

    fn display_name() -> &'static str {
        "Синхронизация маркетплейса"
    }

    fn description() -> &'static str {
        "Выгрузка товаров и заказов маркетплейса в нормализованное хранилище"
    }
}
