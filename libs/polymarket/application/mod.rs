//! Application Layer
//!
//! Contains use cases and application services.
//! This layer depends on domain and infrastructure layers.

pub mod trading_engine;

pub use trading_engine::{BookView, TradingEngine, TradingEngineStores};
