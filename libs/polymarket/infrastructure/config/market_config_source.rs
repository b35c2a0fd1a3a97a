//! Market/policy config source for the quoting engine
//!
//! Distinct from `StrategiesConfig`/`BotConfig`: this table is hot-reloaded
//! by the Reconciler every 30s rather than loaded once at startup, so it is
//! a trait (`MarketConfigSource`) rather than a single `load()` function -
//! production points it at whatever tabular system backs the market list
//! (out of scope here); a YAML file is the implementation this crate ships
//! for local runs and tests, following `StrategiesConfig::load`'s
//! read-parse-validate shape.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketRow, PolicyParams};
use crate::infrastructure::errors::EngineError;

/// Hot-swappable source of the market table + policy-param buckets.
#[async_trait]
pub trait MarketConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<(Vec<MarketRow>, HashMap<String, PolicyParams>), EngineError>;
}

/// On-disk representation: one YAML file with both tables, matching the
/// `BotConfig`/`StrategiesConfig` single-document convention.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct MarketConfigFile {
    #[serde(default)]
    markets: Vec<MarketRow>,
    #[serde(default)]
    policy_params: HashMap<String, PolicyParams>,
}

/// Reads the market/policy table from a YAML file on every `fetch()` call -
/// the Reconciler already runs this on a 30s cadence, so no separate
/// file-watcher is needed.
pub struct YamlMarketConfigSource {
    path: PathBuf,
}

impl YamlMarketConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MarketConfigSource for YamlMarketConfigSource {
    async fn fetch(&self) -> Result<(Vec<MarketRow>, HashMap<String, PolicyParams>), EngineError> {
        let path = self.path.clone();
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EngineError::Config(format!("reading {}: {}", path.display(), e)))?;
        let file: MarketConfigFile = serde_yaml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("parsing {}: {}", path.display(), e)))?;
        Ok((file.markets, file.policy_params))
    }
}

/// Writes a starter market config file, used by integration tests that want
/// a real filesystem round trip rather than an in-memory fake.
#[cfg(test)]
pub(crate) fn write_fixture(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write market config fixture");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_markets_and_policy_params_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.yaml");
        write_fixture(
            &path,
            r#"
markets:
  - condition_id: cond1
    token1: tokA
    token2: tokB
    tick_size: 0.01
    min_size: 20.0
    max_spread: 300.0
    neg_risk: false
    trade_size: 50.0
    max_size: 500.0
    param_type: default
policy_params:
  default:
    stop_loss_threshold: -10.0
    take_profit_threshold: 4.0
    spread_threshold: 0.02
    volatility_threshold: 50.0
    sleep_period_hours: 1.0
"#,
        );

        let source = YamlMarketConfigSource::new(path);
        let (markets, params) = source.fetch().await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].condition_id, "cond1");
        assert_eq!(params["default"].stop_loss_threshold, -10.0);
    }

    #[tokio::test]
    async fn missing_file_is_a_config_error() {
        let source = YamlMarketConfigSource::new("/nonexistent/path/markets.yaml");
        let result = source.fetch().await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
