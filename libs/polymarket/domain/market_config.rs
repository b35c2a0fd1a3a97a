//! Market configuration domain entities for the quoting engine.
//!
//! Markets are read-only from the engine's perspective: they are refreshed
//! wholesale by the Reconciler and never mutated in place by trade-pass code.
//! Grounded in the Python original's market-row / hyperparameter tables (see
//! `MarketConfigSource` in `infrastructure::config` for the loader side).

use serde::{Deserialize, Serialize};

/// Which of a market's two tokens this is. `Token1` is the YES leg, `Token2`
/// is the NO leg whose book view is derived from Token1 by `p -> 1-p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRole {
    Token1,
    Token2,
}

impl TokenRole {
    pub fn opposite(&self) -> Self {
        match self {
            TokenRole::Token1 => TokenRole::Token2,
            TokenRole::Token2 => TokenRole::Token1,
        }
    }
}

/// A single row of the market table, as loaded from the (out-of-scope)
/// spreadsheet-backed configuration source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRow {
    pub condition_id: String,
    pub token1: String,
    pub token2: String,
    /// Price-grid quantum, e.g. 0.01.
    pub tick_size: f64,
    /// Minimum order size in USDC.
    pub min_size: f64,
    /// Rebate-incentive max spread, as a percent of mid price (e.g. `3.0`
    /// for 3%) - the buy path's rebate floor is `mid - max_spread / 100`.
    pub max_spread: f64,
    pub neg_risk: bool,
    pub trade_size: f64,
    pub max_size: f64,
    /// Multiplier applied to buy size when quoting below 0.1; absent when
    /// the market has no configured size multiplier.
    #[serde(default)]
    pub multiplier: Option<f64>,
    /// Key into the `PolicyParams` table (volatility/risk bucket).
    pub param_type: String,
    /// Rolling volatility indicators sourced from config, keyed by window.
    #[serde(default)]
    pub volatility: VolatilityRow,
}

/// Rolling volatility indicators carried alongside a market row. Only the
/// 3-hour column is consulted by the engine today (§4.8e/f); the rest are
/// carried through because the upstream table always supplies all of them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VolatilityRow {
    #[serde(rename = "1h", default)]
    pub h1: f64,
    #[serde(rename = "3h", default)]
    pub h3: f64,
    #[serde(rename = "7d", default)]
    pub d7: f64,
}

impl MarketRow {
    /// Look up a token's role within this market, if it belongs here.
    pub fn role_of(&self, token: &str) -> Option<TokenRole> {
        if token == self.token1 {
            Some(TokenRole::Token1)
        } else if token == self.token2 {
            Some(TokenRole::Token2)
        } else {
            None
        }
    }

    pub fn token(&self, role: TokenRole) -> &str {
        match role {
            TokenRole::Token1 => &self.token1,
            TokenRole::Token2 => &self.token2,
        }
    }
}

/// Hyperparameter bucket, keyed by `param_type` on a `MarketRow`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolicyParams {
    /// Percent P&L below which a stop-loss unwind triggers (e.g. -10.0).
    pub stop_loss_threshold: f64,
    /// Percent above avgPrice a take-profit ask targets (e.g. 4.0).
    pub take_profit_threshold: f64,
    /// Spread (absolute price units) gating the stop-loss condition.
    pub spread_threshold: f64,
    /// Percent 3h volatility above which buy quoting is suppressed.
    pub volatility_threshold: f64,
    /// Cooldown, in hours, applied after a stop-loss trigger.
    pub sleep_period_hours: f64,
}

impl Default for PolicyParams {
    /// Conservative defaults used only when a market's `param_type` has no
    /// matching row - the engine should always have a real hyperparameter
    /// table, but a market must never be quoted against a missing bucket.
    fn default() -> Self {
        Self {
            stop_loss_threshold: -10.0,
            take_profit_threshold: 4.0,
            spread_threshold: 0.02,
            volatility_threshold: 50.0,
            sleep_period_hours: 1.0,
        }
    }
}

/// Persisted risk state for a single market, written on stop-loss trigger
/// and consulted at buy-decision time. Serialized to
/// `positions/<condition_id>.json`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskState {
    /// Unix seconds when the stop-loss fired.
    pub time: i64,
    /// Unix seconds until which new bids are suppressed for this market.
    pub sleep_till: i64,
    /// Why the stop-loss fired, for the operator log / persisted record.
    pub reason: RiskReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskReason {
    PnlAndSpread,
    Volatility,
}

impl RiskState {
    pub fn new(now: i64, sleep_period_hours: f64, reason: RiskReason) -> Self {
        Self {
            time: now,
            sleep_till: now + (sleep_period_hours * 3600.0) as i64,
            reason,
        }
    }

    pub fn is_active(&self, now: i64) -> bool {
        now < self.sleep_till
    }
}
