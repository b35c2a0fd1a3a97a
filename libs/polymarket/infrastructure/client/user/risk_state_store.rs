//! Risk state persistence - one file per market at `positions/<condition_id>.json`
//!
//! Holds the last `RiskState` written on a stop-loss trigger. Read at
//! buy-decision time (so a process restart doesn't forget an active sleep
//! window) and written only when stop-loss fires.

use std::path::{Path, PathBuf};

use crate::domain::RiskState;

#[derive(Debug, thiserror::Error)]
pub enum RiskStateError {
    #[error("failed to read risk state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse risk state file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Directory-rooted store for per-market `RiskState` files.
#[derive(Debug, Clone)]
pub struct RiskStateStore {
    root: PathBuf,
}

impl RiskStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, condition_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", condition_id))
    }

    /// Read the persisted risk state for a market, if any. A missing file
    /// means "never triggered" rather than an error.
    pub fn load(&self, condition_id: &str) -> Result<Option<RiskState>, RiskStateError> {
        let path = self.path_for(condition_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Persist a newly-triggered risk state, creating the directory if
    /// needed.
    pub fn save(&self, condition_id: &str, state: &RiskState) -> Result<(), RiskStateError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(condition_id);
        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for RiskStateStore {
    fn default() -> Self {
        Self::new(default_root())
    }
}

fn default_root() -> PathBuf {
    Path::new("positions").to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskReason;

    #[test]
    fn round_trips_through_a_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = RiskStateStore::new(dir.path());

        assert!(store.load("cond1").unwrap().is_none());

        let state = RiskState::new(1_000, 1.0, RiskReason::Volatility);
        store.save("cond1", &state).unwrap();

        let loaded = store.load("cond1").unwrap().unwrap();
        assert_eq!(loaded.sleep_till, state.sleep_till);
        assert_eq!(loaded.reason, RiskReason::Volatility);
    }
}
