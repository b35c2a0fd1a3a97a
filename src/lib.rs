//! Polymarket Trading Bot - Main Library
//!
//! This crate provides the main library for the Polymarket trading bot,
//! following Clean Architecture principles.
//!
//! ## Architecture
//!
//! - **polymarket**: Core business logic (re-exported from workspace)
//! - **hypersockets**: WebSocket library (re-exported from workspace)
//!
//! ## Usage
//!
//! ```rust
//! use polymarket_arb_bot::polymarket::application::TradingEngine;
//! ```

// Re-export workspace libraries for convenience
pub use polymarket;
pub use hypersockets;
