//! Market Config Store - hot-swappable market table + policy params
//!
//! Loads market rows and hyperparameter buckets from an external tabular
//! source (the spreadsheet-backed config client is out of scope here; this
//! store only holds the already-parsed result and decides when to accept a
//! refresh). Also maintains the reverse token->(condition_id, role) index
//! the event router needs to find which market a token belongs to, and
//! seeds a `PendingTracker` bucket for every `{token1,token2}x{buy,sell}`
//! column up front - grounded in the Python original's `update_markets`,
//! which does the same seeding pass whenever the market table reloads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::{MarketRow, PolicyParams, TokenRole};

use super::pending_tracker::{pending_column, PendingTracker};

/// Thread-safe shared handle.
pub type SharedMarketConfigStore = Arc<RwLock<MarketConfigStore>>;

/// Where a token sits: which market, and which leg of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLocation<'a> {
    pub condition_id: &'a str,
    pub role: TokenRole,
}

#[derive(Default)]
pub struct MarketConfigStore {
    markets: HashMap<String, MarketRow>,
    policy_params: HashMap<String, PolicyParams>,
    /// token -> condition_id, so a caller can look up the owning market and
    /// then ask that market for the token's role.
    token_index: HashMap<String, String>,
}

impl MarketConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, condition_id: &str) -> Option<&MarketRow> {
        self.markets.get(condition_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &MarketRow> {
        self.markets.values()
    }

    /// Policy params for a market, falling back to the engine-wide default
    /// bucket if `param_type` has no matching row (never a missing bucket).
    pub fn policy_for(&self, market: &MarketRow) -> PolicyParams {
        self.policy_params
            .get(&market.param_type)
            .copied()
            .unwrap_or_default()
    }

    /// Find which market (and which leg) a token belongs to.
    pub fn locate(&self, token: &str) -> Option<TokenLocation<'_>> {
        let condition_id = self.token_index.get(token)?;
        let market = self.markets.get(condition_id)?;
        let role = market.role_of(token)?;
        Some(TokenLocation { condition_id, role })
    }

    /// Sibling of `token` within its market (YES<->NO), if known.
    pub fn sibling_of(&self, token: &str) -> Option<&str> {
        let loc = self.locate(token)?;
        let market = self.markets.get(loc.condition_id)?;
        Some(market.token(loc.role.opposite()))
    }

    /// Replace the market table and policy params, but only if non-empty -
    /// an empty fetch (transient upstream failure) must never wipe out the
    /// last-known-good config (§7 "Config fetch empty").
    ///
    /// Seeds a `PendingTracker` bucket for every `{token1,token2}x{buy,sell}`
    /// combination on every row in the new table, even for markets that have
    /// never traded, so `PendingTracker::is_empty` is well-defined from the
    /// first tick a market is known.
    pub fn refresh(
        &mut self,
        rows: Vec<MarketRow>,
        policy_params: HashMap<String, PolicyParams>,
        pending: &mut PendingTracker,
    ) {
        if rows.is_empty() {
            tracing::warn!("[MarketConfigStore] empty market fetch, keeping previous table");
            return;
        }

        let mut markets = HashMap::with_capacity(rows.len());
        let mut token_index = HashMap::with_capacity(rows.len() * 2);

        for row in rows {
            for token in [&row.token1, &row.token2] {
                token_index.insert(token.clone(), row.condition_id.clone());
            }
            for token in [row.token1.as_str(), row.token2.as_str()] {
                for side in ["buy", "sell"] {
                    pending.ensure_column(&pending_column(token, side));
                }
            }
            markets.insert(row.condition_id.clone(), row);
        }

        self.markets = markets;
        self.token_index = token_index;

        if !policy_params.is_empty() {
            self.policy_params = policy_params;
        }
    }
}
