use serde::{Deserialize, Serialize};

/// Результат выполнения UseCase
pub type UseCaseResult<T> = Result<T, UseCaseError>;

/// Ошибка выполнения UseCase
///
/// Сериализуемое тело ошибки для HTTP-ответов. Код соответствует
/// таксономии ошибок оркестратора.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl UseCaseError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Некорректный ввод; повторять бессмысленно
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Рукопожатие с адаптером не удалось
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new("CONNECTION_ERROR", message)
    }

    /// Синхронизация этой пары уже выполняется
    pub fn sync_in_progress(message: impl Into<String>) -> Self {
        Self::new("SYNC_IN_PROGRESS", message)
    }

    /// Адаптер не уложился в таймаут; можно повторить позже
    pub fn adapter_timeout(message: impl Into<String>) -> Self {
        Self::new("ADAPTER_TIMEOUT", message)
    }

    /// Временная ошибка адаптера; можно повторить позже
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::new("ADAPTER_ERROR", message)
    }

    /// Подпись webhook-события не прошла проверку
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new("INVALID_SIGNATURE", message)
    }

    /// Неизвестный тип webhook-события
    pub fn unknown_event_type(message: impl Into<String>) -> Self {
        Self::new("UNKNOWN_EVENT_TYPE", message)
    }

    /// Нарушение бизнес-правила (например, отгрузка доставленного заказа)
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new("INVALID_STATE", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for UseCaseError {}

impl From<anyhow::Error> for UseCaseError {
    fn from(err: anyhow::Error) -> Self {
        UseCaseError::internal(err.to_string())
    }
}
