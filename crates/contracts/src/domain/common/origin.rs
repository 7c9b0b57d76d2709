use serde::{Deserialize, Serialize};

/// Источник данных для агрегата
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Внешний маркетплейс (записи создаёт синхронизация)
    Marketplace,
    /// Собственная система
    #[serde(rename = "self")]
    Self_,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Marketplace => "marketplace",
            Origin::Self_ => "self",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
