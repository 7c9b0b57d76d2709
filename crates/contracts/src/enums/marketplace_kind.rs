use serde::{Deserialize, Serialize};

/// Виды маркетплейсов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketplaceKind {
    Wildberries,
    Ozon,
    YandexMarket,
    Aliexpress,
    Sber,
    #[serde(rename = "kazanexpress")]
    KazanExpress,
}

impl MarketplaceKind {
    /// Код вида маркетплейса (хранится в БД, используется в URL)
    pub fn code(&self) -> &'static str {
        match self {
            MarketplaceKind::Wildberries => "wildberries",
            MarketplaceKind::Ozon => "ozon",
            MarketplaceKind::YandexMarket => "yandex_market",
            MarketplaceKind::Aliexpress => "aliexpress",
            MarketplaceKind::Sber => "sber",
            MarketplaceKind::KazanExpress => "kazanexpress",
        }
    }

    /// Получить человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            MarketplaceKind::Wildberries => "Wildberries",
            MarketplaceKind::Ozon => "Ozon",
            MarketplaceKind::YandexMarket => "Яндекс Маркет",
            MarketplaceKind::Aliexpress => "AliExpress",
            MarketplaceKind::Sber => "СберМегаМаркет",
            MarketplaceKind::KazanExpress => "KazanExpress",
        }
    }

    /// Получить все виды маркетплейсов
    pub fn all() -> Vec<MarketplaceKind> {
        vec![
            MarketplaceKind::Wildberries,
            MarketplaceKind::Ozon,
            MarketplaceKind::YandexMarket,
            MarketplaceKind::Aliexpress,
            MarketplaceKind::Sber,
            MarketplaceKind::KazanExpress,
        ]
    }

    /// Требует ли вид маркетплейса client_id в учётных данных
    pub fn requires_client_id(&self) -> bool {
        matches!(self, MarketplaceKind::Ozon)
    }

    /// Парсинг из кода
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "wildberries" => Some(MarketplaceKind::Wildberries),
            "ozon" => Some(MarketplaceKind::Ozon),
            "yandex_market" => Some(MarketplaceKind::YandexMarket),
            "aliexpress" => Some(MarketplaceKind::Aliexpress),
            "sber" => Some(MarketplaceKind::Sber),
            "kazanexpress" => Some(MarketplaceKind::KazanExpress),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarketplaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_from_code() {
        for kind in MarketplaceKind::all() {
            assert_eq!(MarketplaceKind::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn serde_representation_matches_code() {
        for kind in MarketplaceKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(MarketplaceKind::from_code("ebay"), None);
    }
}
