use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Идентификатор арендатора (продавца)
///
/// Все записи оркестратора привязаны к арендатору; идентификатор
/// прокидывается через каждую операцию как ключ области видимости.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }

    /// Разобрать из строки
    pub fn parse(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(TenantId::new)
            .map_err(|e| format!("Invalid tenant id: {}", e))
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
