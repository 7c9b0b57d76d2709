pub mod d401_overview;
pub mod d402_analytics;
