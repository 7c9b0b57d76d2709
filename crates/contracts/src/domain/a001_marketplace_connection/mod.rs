pub mod aggregate;

pub use aggregate::{
    ConnectionState, MarketplaceConnection, MarketplaceConnectionDto, MarketplaceConnectionId,
    MarketplaceCredentials,
};
