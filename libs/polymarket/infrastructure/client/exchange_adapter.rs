//! ExchangeAdapter (C9) - the one seam the engine crosses to touch the world
//!
//! A thin async port over `TradingClient` (orders), `DataApiClient`
//! (position snapshots) and `CtfClient`/`merge_via_safe` (on-chain merge),
//! so the quoting algorithm and the Reconciler never talk to `reqwest` or
//! `ethers` directly. Every method is wrapped in the shared
//! `infrastructure::retry` decorator per the port's own backoff policy
//! (initial 2s, factor 2, 3 attempts), matching `TradingClient::from_env`'s
//! existing error taxonomy for what counts as transient.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::{Address, TxHash, U256};

use crate::infrastructure::client::clob::{
    BalanceAllowanceParams, OpenOrderParams, Side as ClobSide, TradingClient, TradingError,
};
use crate::infrastructure::client::ctf::{merge_via_safe, CtfError};
use crate::infrastructure::client::data::{DataApiClient, DataApiError, PositionFilters};
use crate::infrastructure::retry::{retry_with_backoff, RetryPolicy};

/// Acknowledgement returned by a successful order placement.
#[derive(Debug, Clone)]
pub struct PlaceAck {
    pub order_id: String,
    pub status: Option<String>,
}

/// A position row as reported by the exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangePositionRow {
    pub size: f64,
    pub avg_price: f64,
}

/// A resting order row as reported by the exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOrderRow {
    pub order_id: String,
    pub side: ClobSide,
    pub price: f64,
    pub original_size: f64,
    pub size_matched: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),
    #[error("data api error: {0}")]
    DataApi(#[from] DataApiError),
    #[error("ctf error: {0}")]
    Ctf(#[from] CtfError),
    #[error("malformed response field {0}")]
    MalformedResponse(&'static str),
}

impl ExchangeError {
    /// Transport/timeout/5xx-shaped failures are worth retrying; a rejected
    /// order or bad request is not - it will fail identically on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ExchangeError::Trading(TradingError::RestError(_)) => true,
            ExchangeError::DataApi(DataApiError::RequestFailed(_)) => true,
            ExchangeError::DataApi(DataApiError::RateLimitExceeded) => true,
            ExchangeError::Ctf(_) => true,
            _ => false,
        }
    }
}

/// Port the TradingEngine and Reconciler depend on. Kept as a trait so tests
/// can substitute a fake exchange without touching a live CLOB.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    async fn place(
        &self,
        token: &str,
        side: ClobSide,
        price: f64,
        size: f64,
        neg_risk: bool,
    ) -> Result<PlaceAck, ExchangeError>;

    async fn cancel_all_for_token(&self, token: &str) -> Result<(), ExchangeError>;
    async fn cancel_all_for_market(&self, condition_id: &str) -> Result<(), ExchangeError>;

    async fn get_positions(&self) -> Result<Vec<(String, ExchangePositionRow)>, ExchangeError>;
    async fn get_open_orders(&self) -> Result<Vec<(String, ExchangeOrderRow)>, ExchangeError>;

    async fn get_raw_balance(&self, token: &str, neg_risk: bool) -> Result<U256, ExchangeError>;
    async fn get_usdc_balance(&self) -> Result<f64, ExchangeError>;

    async fn merge(&self, raw_amount: U256, condition_id: &str, neg_risk: bool) -> Result<TxHash, ExchangeError>;
}

/// On-chain settlement parameters the merge path needs and that the CLOB
/// REST/WS surface has no notion of.
pub struct MergeSettlement {
    pub safe_address: Address,
    pub wallet: LocalWallet,
    pub rpc_url: String,
}

/// Concrete `ExchangeAdapter` wrapping the three infra clients the engine
/// actually touches on the exchange side.
pub struct PolymarketExchangeAdapter {
    trading: Arc<TradingClient>,
    data: DataApiClient,
    maker_address: String,
    settlement: MergeSettlement,
}

impl PolymarketExchangeAdapter {
    pub fn new(trading: Arc<TradingClient>, maker_address: String, settlement: MergeSettlement) -> Self {
        Self { trading, data: DataApiClient::new(), maker_address, settlement }
    }

    fn field_str<'a>(order: &'a serde_json::Value, key: &'static str) -> Result<&'a str, ExchangeError> {
        order.get(key).and_then(|v| v.as_str()).ok_or(ExchangeError::MalformedResponse(key))
    }

    fn field_f64(order: &serde_json::Value, key: &'static str) -> Result<f64, ExchangeError> {
        Self::field_str(order, key)?
            .parse::<f64>()
            .map_err(|_| ExchangeError::MalformedResponse(key))
    }
}

#[async_trait]
impl ExchangeAdapter for PolymarketExchangeAdapter {
    async fn place(
        &self,
        token: &str,
        side: ClobSide,
        price: f64,
        size: f64,
        _neg_risk: bool,
    ) -> Result<PlaceAck, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            let mut builder = self.trading.order(token).price(price).size(size).gtc();
            builder = match side {
                ClobSide::Buy => builder.buy(),
                ClobSide::Sell => builder.sell(),
            };
            let resp = builder.execute().await?;
            Ok(PlaceAck {
                order_id: resp.order_id.unwrap_or_default(),
                status: resp.status,
            })
        })
        .await
    }

    async fn cancel_all_for_token(&self, token: &str) -> Result<(), ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            let params = OpenOrderParams {
                asset_id: Some(token.to_string()),
                ..Default::default()
            };
            let orders = self.trading.get_orders(Some(&params)).await?;
            let ids: Vec<String> = orders
                .iter()
                .filter_map(|o| o.get("id").and_then(|v| v.as_str()).map(String::from))
                .collect();
            if !ids.is_empty() {
                self.trading.cancel_orders(&ids).await?;
            }
            Ok(())
        })
        .await
    }

    async fn cancel_all_for_market(&self, condition_id: &str) -> Result<(), ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            self.trading.cancel_market_orders(Some(condition_id), None).await?;
            Ok(())
        })
        .await
    }

    async fn get_positions(&self) -> Result<Vec<(String, ExchangePositionRow)>, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            let positions = self
                .data
                .get_all_positions(&self.maker_address, Some(PositionFilters::default()))
                .await?;
            Ok(positions
                .into_iter()
                .map(|p| (p.asset, ExchangePositionRow { size: p.size, avg_price: p.avg_price }))
                .collect())
        })
        .await
    }

    async fn get_open_orders(&self) -> Result<Vec<(String, ExchangeOrderRow)>, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            let orders = self.trading.get_orders(None).await?;
            let mut rows = Vec::with_capacity(orders.len());
            for order in &orders {
                let token = Self::field_str(order, "asset_id")?.to_string();
                let order_id = Self::field_str(order, "id")?.to_string();
                let side_str = Self::field_str(order, "side")?;
                let side = if side_str.eq_ignore_ascii_case("BUY") { ClobSide::Buy } else { ClobSide::Sell };
                let price = Self::field_f64(order, "price")?;
                let original_size = Self::field_f64(order, "original_size")?;
                let size_matched = Self::field_f64(order, "size_matched")?;
                rows.push((token, ExchangeOrderRow { order_id, side, price, original_size, size_matched }));
            }
            Ok(rows)
        })
        .await
    }

    async fn get_raw_balance(&self, token: &str, _neg_risk: bool) -> Result<U256, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            let allowance = self
                .trading
                .get_balance_allowance(Some(&BalanceAllowanceParams {
                    token_id: Some(token.to_string()),
                    ..Default::default()
                }))
                .await?;
            allowance
                .balance
                .parse::<U256>()
                .map_err(|_| ExchangeError::MalformedResponse("balance"))
        })
        .await
    }

    async fn get_usdc_balance(&self) -> Result<f64, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            Ok(self.trading.get_usd_balance().await?)
        })
        .await
    }

    async fn merge(&self, raw_amount: U256, condition_id: &str, neg_risk: bool) -> Result<TxHash, ExchangeError> {
        retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, ExchangeError::is_transient, || async {
            merge_via_safe(
                self.settlement.safe_address,
                condition_id,
                neg_risk,
                raw_amount,
                &self.settlement.wallet,
                &self.settlement.rpc_url,
            )
            .await
            .map_err(ExchangeError::from)
        })
        .await
    }
}
