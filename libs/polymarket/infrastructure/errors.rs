//! Engine-wide error type
//!
//! A single `thiserror` enum the TradingEngine, Reconciler and EventRouter
//! propagate at their boundaries, instead of leaking `reqwest`/`ethers`
//! error types into application code. Mirrors `TradingError`/`DataApiError`'s
//! shape (one variant per failure mode, `#[from]` where a lower layer's
//! error converts cleanly) but adds the `is_transient()` classification the
//! retry decorator and the Reconciler both need.

use thiserror::Error;

use crate::infrastructure::client::exchange_adapter::ExchangeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("exchange rejected the request: {0}")]
    ExchangeRejected(String),

    #[error("on-chain merge failed: {0}")]
    MergeFailed(String),

    #[error("internal state inconsistency: {0}")]
    Inconsistent(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether a retry (rather than surfacing to the operator) is
    /// appropriate. Only transport-shaped failures are transient; a
    /// rejection, merge failure or config error will reproduce identically.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }
}

impl From<ExchangeError> for EngineError {
    fn from(err: ExchangeError) -> Self {
        if err.is_transient() {
            EngineError::Transport(err.to_string())
        } else {
            EngineError::ExchangeRejected(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_transient() {
        assert!(EngineError::Transport("timeout".into()).is_transient());
        assert!(!EngineError::ExchangeRejected("bad request".into()).is_transient());
        assert!(!EngineError::Config("missing field".into()).is_transient());
    }
}
