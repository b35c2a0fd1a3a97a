//! Infrastructure Layer
//!
//! Contains implementations of external interfaces (API clients, persisted
//! stores, config loading, retry policy). Depends on the domain layer but
//! not on the application layer.

pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod retry;

// Re-export commonly used types from client
pub use client::{
    clob::{Market, OrderArgs, OrderBook, OrderType, Outcome, PriceLevel, RestClient, Side, WebSocketClient},
    ctf::{merge_via_safe, split_via_safe, CtfClient, CtfError},
    PolymarketAuth,
};

// Re-export config types
pub use config::{MarketConfigSource, YamlMarketConfigSource};

// Re-export infrastructure services
pub use errors::EngineError;
pub use logging::{init_tracing, init_tracing_with_level};
pub use retry::{retry_with_backoff, RetryPolicy};
