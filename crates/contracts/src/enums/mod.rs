pub mod marketplace_kind;

pub use marketplace_kind::MarketplaceKind;
