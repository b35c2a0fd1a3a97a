//! Pending Trade Tracker
//!
//! Tracks trade IDs that have been applied optimistically (on MATCHED) but have
//! not yet reached a terminal on-chain status (MINED/CONFIRMED or FAILED).
//! While a column has pending entries, the Reconciler must not let a stale REST
//! snapshot overwrite `Position.size` for that side of that token - doing so
//! would erase the optimistic update before the chain confirms it.
//!
//! Grounded in the Python original's `global_state.performing` dict of sets,
//! keyed by `"{token}_{side}"`, and its `add_to_performing`/`remove_from_performing`
//! helpers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a pending entry is kept before being garbage-collected even if no
/// terminal status ever arrives for it.
const PENDING_TTL: Duration = Duration::from_secs(15);

/// Build the `"{token}_{side}"` bucket key used throughout the reconcile path.
pub fn pending_column(token: &str, side: &str) -> String {
    format!("{}_{}", token, side.to_lowercase())
}

/// Tracks in-flight trade IDs per `{token}_{side}` column.
#[derive(Debug, Default)]
pub struct PendingTracker {
    columns: HashMap<String, HashMap<String, Instant>>,
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a column exists even with no pending entries yet. Mirrors
    /// `update_markets()` seeding every `{token1,token2}_{buy,sell}` bucket on load.
    pub fn ensure_column(&mut self, column: &str) {
        self.columns.entry(column.to_string()).or_default();
    }

    /// Record a trade ID as pending (in flight) on a column.
    pub fn add(&mut self, column: &str, trade_id: &str) {
        self.columns
            .entry(column.to_string())
            .or_default()
            .insert(trade_id.to_string(), Instant::now());
    }

    /// Remove a trade ID from a column - the trade reached a terminal status.
    pub fn remove(&mut self, column: &str, trade_id: &str) {
        if let Some(bucket) = self.columns.get_mut(column) {
            bucket.remove(trade_id);
        }
    }

    /// Drop entries older than `PENDING_TTL`. Call once per reconcile tick.
    pub fn gc(&mut self) {
        let now = Instant::now();
        for bucket in self.columns.values_mut() {
            bucket.retain(|_, inserted_at| now.duration_since(*inserted_at) < PENDING_TTL);
        }
    }

    /// True when the column has no in-flight trade IDs (or was never seeded).
    pub fn is_empty(&self, column: &str) -> bool {
        self.columns.get(column).map(|b| b.is_empty()).unwrap_or(true)
    }

    /// True when both the buy and sell columns for `token` are empty - the
    /// condition the Reconciler requires before it may fully overwrite a
    /// tracked position's size (as opposed to avg-price-only reconciliation).
    pub fn is_empty_for_token(&self, token: &str) -> bool {
        self.is_empty(&pending_column(token, "buy")) && self.is_empty(&pending_column(token, "sell"))
    }
}
