//! CLOB (Central Limit Order Book) API client and types
//!
//! Provides REST and WebSocket clients for trading on Polymarket.

mod constants;
mod helpers;
mod order_builder;

pub mod rest;
pub mod types;
pub mod trading;

pub use constants::POLYGON_CHAIN_ID;
pub use rest::RestClient;
pub use hypersockets::WebSocketClient;
pub use trading::{TradingClient, TradingError};
pub use types::*;
