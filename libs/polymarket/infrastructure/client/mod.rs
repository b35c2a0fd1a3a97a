//! Polymarket API clients
//!
//! Provides the CLOB trading/market-data clients and the on-chain CTF merge
//! path the quoting engine needs. Market-discovery and redemption clients
//! (gamma, redeem) and the unrelated price-feed trackers (binance, oracle,
//! sports) carried by the wider teacher repo have no counterpart in this
//! engine's scope and were dropped - see DESIGN.md.

pub mod auth;
pub mod clob;
pub mod ctf;
pub mod data;
pub mod exchange_adapter;
pub mod user;

pub use auth::PolymarketAuth;
pub use clob::{
    Market, OrderArgs, OrderBook, OrderType, Outcome, PriceLevel, RestClient, Side, TradingClient,
    TradingError, WebSocketClient,
};
pub use data::{DataApiClient, Position, PositionFilters, PositionSortBy, SortDirection};
pub use exchange_adapter::{
    ExchangeAdapter, ExchangeError, ExchangeOrderRow, ExchangePositionRow, MergeSettlement,
    PlaceAck, PolymarketExchangeAdapter,
};
pub use ctf::{merge_via_safe, split_via_safe, CtfClient, CtfError};
