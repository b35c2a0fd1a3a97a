//! Domain Layer
//!
//! Contains pure business entities and domain models.
//! This layer has no dependencies on infrastructure or application layers.

pub mod market_config;
pub mod orderbook;

// Re-export quoting-engine market configuration entities
pub use market_config::{MarketRow, PolicyParams, RiskReason, RiskState, TokenRole, VolatilityRow};

// Re-export order-book ladder primitives
pub use orderbook::{micros_to_f64, price_to_micros, Orderbook, PriceLevel};
