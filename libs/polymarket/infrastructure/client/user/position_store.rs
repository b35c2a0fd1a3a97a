//! Position Store - real-time per-token position tracking
//!
//! Semantics are intentionally narrower than a full PnL ledger: `avgPrice`
//! only moves on BUY fills (a weighted average across additive buys), SELL
//! fills only shrink `size`, and merges zero `size` without touching
//! `avgPrice`. This mirrors the Python original's `set_position`/`get_position`
//! pair in `data_utils.py`, which this module is grounded on directly.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Net position in a single token.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub size: f64,
    pub avg_price: f64,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.size.abs() < 1e-9
    }
}

/// Side of a fill, as applied to position accounting (BUY grows, SELL shrinks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSide {
    Buy,
    Sell,
}

/// Thread-safe shared handle.
pub type SharedPositionStore = Arc<RwLock<PositionStore>>;

/// Holds the positions for every token this process has seen, plus the
/// per-token timestamp of the last applied fill (used for the reconcile
/// grace window).
pub struct PositionStore {
    positions: HashMap<String, Position>,
    last_trade_update: HashMap<String, Instant>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            last_trade_update: HashMap::new(),
        }
    }

    /// Get a position, defaulting to flat if the token hasn't been seen.
    pub fn get(&self, token: &str) -> Position {
        self.positions.get(token).copied().unwrap_or_default()
    }

    pub fn last_trade_update(&self, token: &str) -> Option<Instant> {
        self.last_trade_update.get(token).copied()
    }

    /// Apply a fill to a token's position.
    ///
    /// BUY: additive weighted-average across `prev_size + fill_size`. If the
    /// prior size was zero, the new price simply becomes `avgPrice`.
    /// SELL: decrements `size` only; `avgPrice` is left untouched.
    pub fn apply_fill(&mut self, token: &str, side: FillSide, size: f64, price: f64) {
        self.last_trade_update.insert(token.to_string(), Instant::now());

        let pos = self.positions.entry(token.to_string()).or_default();
        let signed_size = match side {
            FillSide::Buy => size,
            FillSide::Sell => -size,
        };

        if signed_size > 0.0 {
            pos.avg_price = if pos.size == 0.0 {
                price
            } else {
                (pos.avg_price * pos.size + price * signed_size) / (pos.size + signed_size)
            };
        }
        // SELL (signed_size <= 0): avgPrice is left unchanged, matching the
        // Python original's set_position exactly.

        pos.size += signed_size;
    }

    /// Zero a position's size (used after an on-chain merge); `avgPrice` is
    /// left as-is since the merged pairs had no new entry price.
    pub fn set_size_after_merge(&mut self, token: &str, new_size: f64) {
        let pos = self.positions.entry(token.to_string()).or_default();
        pos.size = new_size;
    }

    /// Reconcile one token against an authoritative REST snapshot.
    ///
    /// `guard_active` should be true when the Reconciler determined this
    /// token's pending columns are non-empty (or within the 5s post-trade
    /// grace window) - in that case only `avgPrice` is overwritten and `size`
    /// is left to the optimistic in-memory value.
    pub fn reconcile(&mut self, token: &str, exchange_size: f64, exchange_avg: f64, guard_active: bool) {
        let pos = self.positions.entry(token.to_string()).or_default();
        pos.avg_price = exchange_avg;
        if !guard_active {
            pos.size = exchange_size;
        }
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}
