//! Configuration loading for the quoting engine.
//!
//! `market_config_source` (§4.5/§10.3) is the engine's market-table/policy
//! loader. The wider teacher repo's bot-wide YAML config (gamma sync
//! intervals, LLM prompts, sniper risk limits) has no counterpart in this
//! engine's scope and was dropped - see DESIGN.md.

pub mod market_config_source;

pub use market_config_source::{MarketConfigSource, YamlMarketConfigSource};
