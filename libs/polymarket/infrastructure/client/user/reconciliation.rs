//! Reconciler - periodic pull of positions/orders/config (C6)
//!
//! A single worker on a fixed 5-second tick, matching §4.6:
//!
//! 1. GC pending entries older than 15s.
//! 2. Pull positions (avg-only, subject to the §4.2 pending+grace guard) and
//!    orders.
//! 3. Every 6th tick (30s), pull markets + policy params.
//!
//! Network errors get exponential backoff (x2, capped at 3 attempts); a tick
//! that exhausts its attempts is skipped and logged, never crashes the loop.
//! Grounded in the Python original's reconcile loop in `main.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::{MarketRow, PolicyParams};
use crate::infrastructure::retry::{retry_with_backoff, RetryPolicy};

use super::market_config_store::MarketConfigStore;
use super::order_store::OrderStore;
use super::pending_tracker::{pending_column, PendingTracker};
use super::position_store::PositionStore;

/// Wall-clock grace period after the last applied fill during which the
/// Reconciler must not overwrite `Position.size` for that token, even if
/// PendingTracker has already emptied out (§4.2).
const POST_TRADE_GRACE: Duration = Duration::from_secs(5);

/// One reconcile tick runs the market/policy refresh every 6th invocation
/// of the 5-second loop (30s).
const MARKET_REFRESH_EVERY_N_TICKS: u64 = 6;

/// An authoritative position snapshot as read from the exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangePosition {
    pub size: f64,
    pub avg_price: f64,
}

/// Port the Reconciler pulls authoritative state through. Implemented by the
/// concrete `ExchangeAdapter` (§4.9); kept separate so the reconcile loop is
/// testable without a live exchange.
#[async_trait::async_trait]
pub trait ReconcileSource: Send + Sync {
    async fn get_positions(&self) -> anyhow::Result<HashMap<String, ExchangePosition>>;
    async fn get_open_orders(&self) -> anyhow::Result<HashMap<String, Vec<super::order_store::ExchangeOrder>>>;
    async fn get_markets(&self) -> anyhow::Result<(Vec<MarketRow>, HashMap<String, PolicyParams>)>;
    /// Cancel every resting order for `token` on the exchange - invoked when
    /// `OrderStore::refresh_from_exchange` finds more than one resting order
    /// on a side (§4.3/§7/§8 invariant 4); the in-memory collapse alone
    /// leaves the stale duplicates live.
    async fn cancel_all_for_token(&self, token: &str) -> anyhow::Result<()>;
}

/// Shared stores the Reconciler mutates in place.
pub struct ReconcilerStores {
    pub positions: Arc<RwLock<PositionStore>>,
    pub orders: Arc<RwLock<OrderStore>>,
    pub pending: Arc<RwLock<PendingTracker>>,
    pub markets: Arc<RwLock<MarketConfigStore>>,
}

/// Runs the §4.6 reconcile algorithm against a `ReconcileSource`, driving the
/// given stores. Not itself a `tokio::spawn`-ed loop - callers wrap `tick()`
/// in whatever scheduling harness (real interval timer, or deterministic
/// test clock) they need.
pub struct Reconciler<S: ReconcileSource> {
    source: S,
    stores: ReconcilerStores,
    tick_count: u64,
}

impl<S: ReconcileSource> Reconciler<S> {
    pub fn new(source: S, stores: ReconcilerStores) -> Self {
        Self { source, stores, tick_count: 0 }
    }

    /// Run the main reconcile loop on a fixed 5-second cadence until
    /// `shutdown` flips false.
    pub async fn run(&mut self, shutdown: Arc<std::sync::atomic::AtomicBool>) {
        use std::sync::atomic::Ordering;
        while shutdown.load(Ordering::Acquire) {
            self.tick().await;
            sleep(Duration::from_secs(5)).await;
        }
    }

    /// Execute a single reconcile tick (§4.6 steps 1-3).
    pub async fn tick(&mut self) {
        self.tick_count += 1;

        self.stores.pending.write().gc();

        if let Err(e) = self.reconcile_positions_and_orders().await {
            warn!("[Reconciler] positions/orders reconcile failed after retries: {}", e);
        }

        if self.tick_count % MARKET_REFRESH_EVERY_N_TICKS == 0 {
            if let Err(e) = self.reconcile_markets().await {
                warn!("[Reconciler] market/policy reconcile failed after retries: {}", e);
            }
        }
    }

    async fn reconcile_positions_and_orders(&mut self) -> anyhow::Result<()> {
        let positions = retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, |_| true, || {
            self.source.get_positions()
        })
        .await?;
        let orders = retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, |_| true, || {
            self.source.get_open_orders()
        })
        .await?;

        let now = Instant::now();
        {
            let pending = self.stores.pending.read();
            let mut store = self.stores.positions.write();
            for (token, exch) in positions {
                let guard_active = !pending.is_empty_for_token(&token)
                    || store
                        .last_trade_update(&token)
                        .map(|t| now.duration_since(t) < POST_TRADE_GRACE)
                        .unwrap_or(false);

                if guard_active {
                    debug!("[Reconciler] {} guarded: avg-only reconcile", token);
                }
                store.reconcile(&token, exch.size, exch.avg_price, guard_active);
            }
        }

        let mut to_cancel = Vec::new();
        {
            let mut store = self.stores.orders.write();
            for (token, exch_orders) in &orders {
                let collapsed = store.refresh_from_exchange(token, exch_orders);
                if !collapsed.is_empty() {
                    warn!(
                        "[Reconciler] token {} has more than one resting order on {:?}, collapsing and cancelling",
                        token, collapsed
                    );
                    to_cancel.push(token.clone());
                }
            }
        }
        for token in to_cancel {
            if let Err(e) = self.source.cancel_all_for_token(&token).await {
                warn!("[Reconciler] failed to cancel duplicate orders for {}: {}", token, e);
            }
        }

        Ok(())
    }

    async fn reconcile_markets(&mut self) -> anyhow::Result<()> {
        let (rows, params) = retry_with_backoff(RetryPolicy::EXCHANGE_DEFAULT, |_| true, || {
            self.source.get_markets()
        })
        .await?;
        let mut pending = self.stores.pending.write();
        self.stores.markets.write().refresh(rows, params, &mut pending);
        Ok(())
    }
}

/// Bridges the live `ExchangeAdapter` + `MarketConfigSource` ports into the
/// shape `ReconcileSource` expects - a thin adapter rather than coupling the
/// Reconciler directly to either trait, so either side can be swapped (or
/// faked in tests) independently.
pub struct LiveReconcileSource<A, C> {
    exchange: Arc<A>,
    config: Arc<C>,
}

impl<A, C> LiveReconcileSource<A, C> {
    pub fn new(exchange: Arc<A>, config: Arc<C>) -> Self {
        Self { exchange, config }
    }
}

#[async_trait::async_trait]
impl<A, C> ReconcileSource for LiveReconcileSource<A, C>
where
    A: crate::infrastructure::client::exchange_adapter::ExchangeAdapter,
    C: crate::infrastructure::config::MarketConfigSource,
{
    async fn get_positions(&self) -> anyhow::Result<HashMap<String, ExchangePosition>> {
        let rows = self.exchange.get_positions().await?;
        Ok(rows
            .into_iter()
            .map(|(token, row)| (token, ExchangePosition { size: row.size, avg_price: row.avg_price }))
            .collect())
    }

    async fn get_open_orders(&self) -> anyhow::Result<HashMap<String, Vec<super::order_store::ExchangeOrder>>> {
        let rows = self.exchange.get_open_orders().await?;
        let mut by_token: HashMap<String, Vec<super::order_store::ExchangeOrder>> = HashMap::new();
        for (token, row) in rows {
            let side = match row.side {
                crate::infrastructure::client::clob::Side::Buy => super::order_store::Side::Buy,
                crate::infrastructure::client::clob::Side::Sell => super::order_store::Side::Sell,
            };
            by_token.entry(token).or_default().push(super::order_store::ExchangeOrder {
                order_id: row.order_id,
                side,
                price: row.price,
                remaining_size: row.original_size - row.size_matched,
            });
        }
        Ok(by_token)
    }

    async fn get_markets(&self) -> anyhow::Result<(Vec<MarketRow>, HashMap<String, PolicyParams>)> {
        Ok(self.config.fetch().await?)
    }

    async fn cancel_all_for_token(&self, token: &str) -> anyhow::Result<()> {
        Ok(self.exchange.cancel_all_for_token(token).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::client::user::order_store::{ExchangeOrder, Side};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct FlakySource {
        positions: HashMap<String, ExchangePosition>,
        fail_until: AtomicU32,
        open_orders: HashMap<String, Vec<ExchangeOrder>>,
        cancelled: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ReconcileSource for FlakySource {
        async fn get_positions(&self) -> anyhow::Result<HashMap<String, ExchangePosition>> {
            let n = self.fail_until.fetch_sub(1, Ordering::SeqCst);
            if n > 0 {
                anyhow::bail!("transient failure");
            }
            Ok(self.positions.clone())
        }

        async fn get_open_orders(&self) -> anyhow::Result<HashMap<String, Vec<ExchangeOrder>>> {
            Ok(self.open_orders.clone())
        }

        async fn get_markets(&self) -> anyhow::Result<(Vec<MarketRow>, HashMap<String, PolicyParams>)> {
            Ok((vec![], HashMap::new()))
        }

        async fn cancel_all_for_token(&self, token: &str) -> anyhow::Result<()> {
            self.cancelled.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    fn stores() -> ReconcilerStores {
        ReconcilerStores {
            positions: Arc::new(RwLock::new(PositionStore::new())),
            orders: Arc::new(RwLock::new(OrderStore::new())),
            pending: Arc::new(RwLock::new(PendingTracker::new())),
            markets: Arc::new(RwLock::new(MarketConfigStore::new())),
        }
    }

    #[tokio::test]
    async fn guarded_reconcile_leaves_size_alone_while_pending() {
        let mut positions = HashMap::new();
        positions.insert("tok".to_string(), ExchangePosition { size: 999.0, avg_price: 0.55 });

        let source = FlakySource { positions, fail_until: AtomicU32::new(0), ..Default::default() };
        let stores = stores();
        stores.positions.write().apply_fill("tok", super::super::position_store::FillSide::Buy, 80.0, 0.40);
        stores.pending.write().add(&pending_column("tok", "buy"), "trade-1");

        let mut reconciler = Reconciler::new(source, stores);
        reconciler.tick().await;

        let pos = reconciler.stores.positions.read().get("tok");
        assert_eq!(pos.size, 80.0);
        assert_eq!(pos.avg_price, 0.55);
    }

    #[tokio::test]
    async fn unguarded_reconcile_overwrites_size() {
        // A token with no pending fills and no prior trade timestamp is
        // never guarded, so the exchange snapshot fully overwrites it.
        let mut positions = HashMap::new();
        positions.insert("tok".to_string(), ExchangePosition { size: 100.0, avg_price: 0.45 });

        let source = FlakySource { positions, fail_until: AtomicU32::new(0), ..Default::default() };
        let stores = stores();

        let mut reconciler = Reconciler::new(source, stores);
        reconciler.tick().await;

        let pos = reconciler.stores.positions.read().get("tok");
        assert_eq!(pos.size, 100.0);
        assert_eq!(pos.avg_price, 0.45);
    }

    #[tokio::test]
    async fn duplicate_resting_orders_collapse_and_trigger_cancel() {
        let mut open_orders = HashMap::new();
        open_orders.insert(
            "tok".to_string(),
            vec![
                ExchangeOrder { order_id: "o1".into(), side: Side::Buy, price: 0.40, remaining_size: 25.0 },
                ExchangeOrder { order_id: "o2".into(), side: Side::Buy, price: 0.41, remaining_size: 10.0 },
            ],
        );
        let source = FlakySource { open_orders, fail_until: AtomicU32::new(0), ..Default::default() };
        let stores = stores();

        let mut reconciler = Reconciler::new(source, stores);
        reconciler.tick().await;

        assert!(reconciler.stores.orders.read().get("tok").buy.is_empty());
        assert_eq!(reconciler.source.cancelled.lock().unwrap().as_slice(), ["tok"]);
    }

    #[tokio::test]
    async fn retries_then_succeeds_within_cap() {
        // Exercises the same retry path as `tick()`, but through a short
        // policy directly rather than `RetryPolicy::EXCHANGE_DEFAULT` - its
        // multi-second backoff would make this test slow for no added
        // coverage (the backoff math itself is tested in `retry.rs`).
        let source = FlakySource { fail_until: AtomicU32::new(2), ..Default::default() };
        let fast = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            factor: 2,
        };
        let result = retry_with_backoff(fast, |_: &anyhow::Error| true, || source.get_positions()).await;
        assert!(result.is_ok());
    }

    #[test]
    fn order_store_side_reexport_compiles() {
        let _ = Side::Buy;
    }
}
