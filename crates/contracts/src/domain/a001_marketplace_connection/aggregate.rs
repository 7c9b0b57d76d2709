use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin, TenantId,
};
use crate::enums::MarketplaceKind;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор подключения к маркетплейсу
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketplaceConnectionId(pub Uuid);

impl MarketplaceConnectionId {
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

impl AggregateId for MarketplaceConnectionId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(MarketplaceConnectionId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Состояние подключения к маркетплейсу
///
/// Переходы: `Disconnected → Connecting → Connected`,
/// `Connected → SyncError → Connected | Disconnected`.
/// Отключение разрешено из любого состояния.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    SyncError,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::SyncError => "sync_error",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "disconnected" => Some(Self::Disconnected),
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            "sync_error" => Some(Self::SyncError),
            _ => None,
        }
    }

    /// Допустим ли переход в состояние `next`
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            // Отключение допустимо всегда (идемпотентно)
            (_, Disconnected) => true,
            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connected, Connected) => true,
            (Connected, SyncError) => true,
            (SyncError, Connected) => true,
            (SyncError, SyncError) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Учётные данные продавца для одного маркетплейса
///
/// Хранятся только в зашифрованном виде; наружу через HTTP не сериализуются
/// никогда, объект живёт в памяти процесса на время вызова адаптера.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceCredentials {
    /// API-ключ продавца
    pub api_key: String,

    /// Идентификатор клиента (обязателен для Ozon)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Идентификатор продавца
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,

    /// Секрет для проверки подписи webhook-уведомлений
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

impl MarketplaceCredentials {
    /// Валидация обязательных полей для конкретного вида маркетплейса
    pub fn validate_for(&self, kind: MarketplaceKind) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API-ключ не может быть пустым".into());
        }
        if kind.requires_client_id() {
            match &self.client_id {
                Some(client_id) if !client_id.trim().is_empty() => {}
                _ => {
                    return Err(format!(
                        "Для {} требуется client_id",
                        kind.display_name()
                    ))
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Подключение арендатора к маркетплейсу
///
/// Не больше одной записи на пару (tenant, marketplace_kind). Создаётся при
/// первой попытке подключения, при отключении помечается удалённой, история
/// синхронизаций сохраняется.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConnection {
    #[serde(flatten)]
    pub base: BaseAggregate<MarketplaceConnectionId>,

    /// Арендатор-владелец подключения
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,

    /// Вид маркетплейса
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,

    /// Текущее состояние подключения
    pub state: ConnectionState,

    /// Непрозрачная ссылка на запись в хранилище учётных данных.
    /// Сам секрет в агрегате не живёт.
    #[serde(rename = "credentialRef")]
    pub credential_ref: Option<Uuid>,

    /// Момент последней успешной синхронизации
    #[serde(rename = "lastSyncAt")]
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Текст последней ошибки синхронизации
    #[serde(rename = "lastSyncError")]
    pub last_sync_error: Option<String>,
}

impl MarketplaceConnection {
    /// Создать новое подключение для первой попытки connect
    pub fn new_for_connect(tenant_id: TenantId, kind: MarketplaceKind) -> Self {
        let base = BaseAggregate::new(
            MarketplaceConnectionId::new_v4(),
            kind.code().to_string(),
            kind.display_name().to_string(),
        );

        Self {
            base,
            tenant_id,
            marketplace_kind: kind,
            state: ConnectionState::Disconnected,
            credential_ref: None,
            last_sync_at: None,
            last_sync_error: None,
        }
    }

    /// Получить ID как строку
    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Перевести в новое состояние с проверкой допустимости перехода
    pub fn transition_to(&mut self, next: ConnectionState) -> Result<(), String> {
        if !self.state.can_transition_to(next) {
            return Err(format!(
                "Недопустимый переход состояния: {} -> {}",
                self.state, next
            ));
        }
        self.state = next;
        self.base.touch();
        Ok(())
    }

    /// Зафиксировать успешную синхронизацию
    pub fn record_sync_success(&mut self, at: chrono::DateTime<chrono::Utc>) {
        self.last_sync_at = Some(at);
        self.last_sync_error = None;
        self.state = ConnectionState::Connected;
        self.base.touch();
    }

    /// Зафиксировать ошибку синхронизации: данные и учётка сохраняются,
    /// подключение остаётся видимым как "connected with errors"
    pub fn record_sync_failure(&mut self, error: impl Into<String>) {
        self.last_sync_error = Some(error.into());
        self.state = ConnectionState::SyncError;
        self.base.touch();
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for MarketplaceConnection {
    type Id = MarketplaceConnectionId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "marketplace_connection"
    }

    fn element_name() -> &'static str {
        "Подключение маркетплейса"
    }

    fn list_name() -> &'static str {
        "Подключения маркетплейсов"
    }

    fn origin() -> Origin {
        Origin::Self_
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO подключения для списков UI (без каких-либо секретов)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConnectionDto {
    pub id: String,
    #[serde(rename = "marketplaceKind")]
    pub marketplace_kind: MarketplaceKind,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub state: ConnectionState,
    #[serde(rename = "lastSyncAt")]
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "lastSyncError")]
    pub last_sync_error: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&MarketplaceConnection> for MarketplaceConnectionDto {
    fn from(conn: &MarketplaceConnection) -> Self {
        Self {
            id: conn.to_string_id(),
            marketplace_kind: conn.marketplace_kind,
            display_name: conn.marketplace_kind.display_name().to_string(),
            state: conn.state,
            last_sync_at: conn.last_sync_at,
            last_sync_error: conn.last_sync_error.clone(),
            created_at: conn.base.metadata.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_is_allowed_from_any_state() {
        use ConnectionState::*;
        for state in [Disconnected, Connecting, Connected, SyncError] {
            assert!(state.can_transition_to(Disconnected));
        }
    }

    #[test]
    fn connect_path_is_the_only_way_up() {
        use ConnectionState::*;
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(SyncError));
        assert!(!Connecting.can_transition_to(SyncError));
    }

    #[test]
    fn sync_error_recovers_to_connected() {
        use ConnectionState::*;
        assert!(Connected.can_transition_to(SyncError));
        assert!(SyncError.can_transition_to(Connected));
        assert!(SyncError.can_transition_to(SyncError));
        assert!(!SyncError.can_transition_to(Connecting));
    }

    #[test]
    fn transition_to_rejects_invalid_moves() {
        let tenant = TenantId::new_v4();
        let mut conn = MarketplaceConnection::new_for_connect(tenant, MarketplaceKind::Ozon);
        assert!(conn.transition_to(ConnectionState::Connected).is_err());
        assert_eq!(conn.state, ConnectionState::Disconnected);

        conn.transition_to(ConnectionState::Connecting).unwrap();
        conn.transition_to(ConnectionState::Connected).unwrap();
        assert_eq!(conn.state, ConnectionState::Connected);
    }

    #[test]
    fn sync_failure_keeps_last_sync_at() {
        let tenant = TenantId::new_v4();
        let mut conn =
            MarketplaceConnection::new_for_connect(tenant, MarketplaceKind::Wildberries);
        conn.transition_to(ConnectionState::Connecting).unwrap();
        conn.transition_to(ConnectionState::Connected).unwrap();

        let synced = chrono::Utc::now();
        conn.record_sync_success(synced);
        conn.record_sync_failure("timeout");

        assert_eq!(conn.state, ConnectionState::SyncError);
        assert_eq!(conn.last_sync_at, Some(synced));
        assert_eq!(conn.last_sync_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn ozon_credentials_require_client_id() {
        let creds = MarketplaceCredentials {
            api_key: "key".into(),
            client_id: None,
            seller_id: None,
            webhook_secret: None,
        };
        assert!(creds.validate_for(MarketplaceKind::Ozon).is_err());
        assert!(creds.validate_for(MarketplaceKind::Wildberries).is_ok());

        let creds = MarketplaceCredentials {
            client_id: Some("12345".into()),
            ..creds
        };
        assert!(creds.validate_for(MarketplaceKind::Ozon).is_ok());
    }

    #[test]
    fn empty_api_key_is_invalid() {
        let creds = MarketplaceCredentials {
            api_key: "   ".into(),
            client_id: Some("12345".into()),
            seller_id: None,
            webhook_secret: None,
        };
        assert!(creds.validate_for(MarketplaceKind::Sber).is_err());
    }
}
