//! Polymarket Trading Bot
//!
//! Automated market-making core for Polymarket's prediction-market CLOB.

// Core layers (Clean Architecture)
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used items from infrastructure
pub use infrastructure::{
    client::clob::{Market, OrderArgs, OrderBook, OrderType, Outcome, PriceLevel, RestClient, Side, WebSocketClient},
    init_tracing, EngineError, PolymarketAuth,
};

// Re-export from application layer
pub use application::{BookView, TradingEngine, TradingEngineStores};

// Re-export quoting-engine market configuration entities from domain layer
pub use domain::market_config::{MarketRow, PolicyParams, RiskReason, RiskState, TokenRole};
