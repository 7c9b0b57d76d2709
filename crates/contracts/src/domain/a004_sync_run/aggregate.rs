use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{AggregateId, TenantId};
use crate::enums::MarketplaceKind;

/// Уникальный идентификатор запуска синхронизации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(pub Uuid);

impl SyncRunId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for SyncRunId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(SyncRunId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

/// Запись об одном запуске синхронизации
///
/// Служебная запись для наблюдаемости: считается завершённой, когда
/// проставлен finished_at. Бизнес-логика на неё не опирается.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: SyncRunId,
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "productsTouched")]
    pub products_touched: i64,
    #[serde(rename = "ordersTouched")]
    pub orders_touched: i64,
    /// Ошибка, оборвавшая или частично испортившая запуск
    pub error: Option<String>,
}

impl SyncRun {
    /// Новая запись в момент старта синхронизации
    pub fn started(tenant_id: TenantId, kind: MarketplaceKind) -> Self {
        Self {
            id: SyncRunId::new_v4(),
            tenant_id,
            marketplace_kind: kind,
            started_at: chrono::Utc::now(),
            finished_at: None,
            products_touched: 0,
            orders_touched: 0,
            error: None,
        }
    }

    /// Завершить запуск с итоговыми счётчиками
    pub fn finish(&mut self, products_touched: i64, orders_touched: i64, error: Option<String>) {
        self.finished_at = Some(chrono::Utc::now());
        self.products_touched = products_touched;
        self.orders_touched = orders_touched;
        self.error = error;
    }
}
