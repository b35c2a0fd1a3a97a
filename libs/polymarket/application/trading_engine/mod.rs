//! TradingEngine (C8) - the per-market quoting/risk/merge pass
//!
//! One `run_market_pass(condition_id)` call is the whole algorithm: merge
//! offsetting exposure, then quote both legs of the market, gated by a
//! per-market lock so two passes for the same market never interleave.
//! Grounded in the Python original's per-market loop body in `main.py`;
//! the store/port APIs it drives (`OrderBookStore`, `PositionStore`,
//! `OrderStore`, `ExchangeAdapter`, `RiskStateStore`) were built first.

mod book_view;
mod sizing;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::domain::market_config::{MarketRow, PolicyParams, RiskReason, RiskState, TokenRole};
use crate::infrastructure::client::clob::Side as ClobSide;
use crate::infrastructure::client::exchange_adapter::ExchangeAdapter;
use crate::infrastructure::client::user::order_store::{RestingOrder, Side as EngineSide};
use crate::infrastructure::client::user::position_store::Position;
use crate::infrastructure::client::user::risk_state_store::RiskStateStore;
use crate::infrastructure::client::user::{
    MarketConfigStore, OrderStore, PositionStore, SharedMarketConfigStore, SharedOrderBookStore,
};
use crate::infrastructure::errors::EngineError;

pub use book_view::BookView;
use book_view::book_view_for;
use sizing::{buy_sell_amounts, target_quote_prices};

/// Positions below this are never worth merging - the on-chain gas cost of a
/// merge would exceed the unwound exposure (§4.8 step 1).
const MIN_MERGE_SIZE: f64 = 1.0;

/// Depth filter used to find a quotable level before falling back to the
/// thinner `FALLBACK_MIN_SIZE` scan (§4.8a).
const PRIMARY_MIN_SIZE: f64 = 100.0;
const FALLBACK_MIN_SIZE: f64 = 20.0;

/// Generic idempotent-replace thresholds for the buy path (§4.8 step 3 /
/// §8 invariant 10).
const REPLACE_PRICE_DELTA: f64 = 0.005;
const REPLACE_SIZE_DELTA_PCT: f64 = 0.10;

/// Take-profit-specific replace thresholds (§4.8g) - deliberately looser
/// than the generic buy-path ones; preserved verbatim rather than unified.
const TAKE_PROFIT_PRICE_DELTA_PCT: f64 = 0.02;
const TAKE_PROFIT_SIZE_FRACTION: f64 = 0.97;

/// Buy-path position cap, independent of `max_size` (§4.8f).
const BUY_PATH_POSITION_CAP: f64 = 250.0;

/// Maximum drift between the computed bid and the book's top-of-book before
/// the buy path is suppressed and existing orders cancelled (§4.8f).
const REFERENCE_DRIFT_MAX: f64 = 0.05;

/// Valid bid price range - the engine never rests a buy outside this band
/// (§4.8f, §8 invariant 7).
const BID_PRICE_FLOOR: f64 = 0.1;
const BID_PRICE_CEIL: f64 = 0.9;

/// How long `run_market_pass` holds the per-market lock past its own work,
/// damping back-to-back passes for a churning market (§4.8 intro).
const MARKET_LOCK_TAIL: Duration = Duration::from_secs(2);

/// The stores a trading pass reads and mutates. Distinct from
/// `EventRouterStores` - the engine owns decision-making, the router owns
/// applying wire events; both share the same underlying `Arc<RwLock<_>>`s.
pub struct TradingEngineStores {
    pub books: SharedOrderBookStore,
    pub positions: Arc<parking_lot::RwLock<PositionStore>>,
    pub orders: Arc<parking_lot::RwLock<OrderStore>>,
    pub markets: SharedMarketConfigStore,
}

/// Runs the quoting/risk/merge algorithm for one market at a time, under a
/// per-`condition_id` lock so concurrent trade-pass triggers for the same
/// market never interleave (§5).
pub struct TradingEngine<A: ExchangeAdapter> {
    stores: TradingEngineStores,
    exchange: Arc<A>,
    risk_state: RiskStateStore,
    market_locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<A: ExchangeAdapter> TradingEngine<A> {
    pub fn new(stores: TradingEngineStores, exchange: Arc<A>, risk_state: RiskStateStore) -> Self {
        Self {
            stores,
            exchange,
            risk_state,
            market_locks: SyncMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, condition_id: &str) -> Arc<AsyncMutex<()>> {
        self.market_locks
            .lock()
            .entry(condition_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Run one full pass for `condition_id`: merge, then quote both legs.
    /// Serialized per market; tails off with a short sleep before releasing
    /// the lock so a burst of book deltas doesn't spawn back-to-back passes.
    pub async fn run_market_pass(&self, condition_id: &str) -> Result<(), EngineError> {
        let lock = self.lock_for(condition_id);
        let _guard = lock.lock().await;

        let Some(market) = self.stores.markets.read().get(condition_id).cloned() else {
            warn!("[TradingEngine] market {} not in config, skipping pass", condition_id);
            return Ok(());
        };
        let policy = self.stores.markets.read().policy_for(&market);

        if let Err(e) = self.merge_offsetting_exposure(&market).await {
            warn!("[TradingEngine] {} merge failed: {}", condition_id, e);
        }

        for role in [TokenRole::Token1, TokenRole::Token2] {
            if let Err(e) = self.quote_token(&market, &policy, role).await {
                warn!(
                    "[TradingEngine] {} ({:?}) quoting pass failed: {}",
                    condition_id, role, e
                );
            }
        }

        tokio::time::sleep(MARKET_LOCK_TAIL).await;
        Ok(())
    }

    /// §4.8 step 1: merge offsetting YES/NO exposure back into USDC.
    async fn merge_offsetting_exposure(&self, market: &MarketRow) -> Result<(), EngineError> {
        let pos1 = self.stores.positions.read().get(&market.token1);
        let pos2 = self.stores.positions.read().get(&market.token2);

        if pos1.size.min(pos2.size) <= MIN_MERGE_SIZE {
            return Ok(());
        }

        let raw1 = self.exchange.get_raw_balance(&market.token1, market.neg_risk).await?;
        let raw2 = self.exchange.get_raw_balance(&market.token2, market.neg_risk).await?;
        let raw_amount = raw1.min(raw2);
        let amount = raw_amount.as_u128() as f64 / 1_000_000.0;

        if amount <= MIN_MERGE_SIZE {
            return Ok(());
        }

        let tx = self.exchange.merge(raw_amount, &market.condition_id, market.neg_risk).await?;
        info!(
            "[TradingEngine] merged {:.2} of {} <-> {} (tx {:?})",
            amount, market.token1, market.token2, tx
        );

        self.stores.positions.write().set_size_after_merge(&market.token1, pos1.size - amount);
        self.stores.positions.write().set_size_after_merge(&market.token2, pos2.size - amount);
        Ok(())
    }

    /// §4.8 step 2: evaluate one leg of the market (risk sell, maker buy,
    /// take-profit sell) and apply the idempotent-replace decision.
    async fn quote_token(
        &self,
        market: &MarketRow,
        policy: &PolicyParams,
        role: TokenRole,
    ) -> Result<(), EngineError> {
        let token = market.token(role).to_string();
        let other_token = market.token(role.opposite()).to_string();

        let view = {
            let books = self.stores.books.read();
            book_view_for(&books, &market.token1, role, PRIMARY_MIN_SIZE, FALLBACK_MIN_SIZE)
        };
        let (Some(best_bid), Some(best_bid_size), Some(best_ask), Some(best_ask_size), Some(top_bid), Some(top_ask)) =
            (view.best_bid, view.best_bid_size, view.best_ask, view.best_ask_size, view.top_bid, view.top_ask)
        else {
            debug!("[TradingEngine] {} has no two-sided book yet, skipping", token);
            return Ok(());
        };

        let position = self.stores.positions.read().get(&token);
        let other_position = self.stores.positions.read().get(&other_token);

        let (bid, ask) = target_quote_prices(
            best_bid,
            best_bid_size,
            best_ask,
            best_ask_size,
            top_bid,
            top_ask,
            position.avg_price,
            market.tick_size,
            market.min_size,
        );
        let (buy_amount, sell_amount) = buy_sell_amounts(position.size, other_position.size, market, bid);

        if self
            .evaluate_stop_loss(market, policy, role, &token, &view, &position, sell_amount)
            .await?
        {
            return Ok(());
        }

        self.evaluate_buy_path(market, policy, role, &token, &view, &position, &other_position, buy_amount, bid)
            .await?;

        self.evaluate_take_profit(market, policy, &token, &view, &position, sell_amount, ask)
            .await?;

        Ok(())
    }

    /// §4.8e: stop-loss unwind. Returns `Ok(true)` when it fired (the buy
    /// path for this token must be skipped this cycle). Gated on
    /// `sell_amount > 0` (and therefore `avgPrice > 0`, since a zero
    /// position has no sell amount) - mirroring the original's `if
    /// sell_amount > 0: ... if avgPrice == 0: continue` guard
    /// (`trading.py:287-291`); without it the volatility trigger alone would
    /// fire this path for a flat position, placing a size-0 sell and
    /// persisting a sleep window that suppresses buys for no reason.
    async fn evaluate_stop_loss(
        &self,
        market: &MarketRow,
        policy: &PolicyParams,
        role: TokenRole,
        token: &str,
        view: &BookView,
        position: &Position,
        sell_amount: f64,
    ) -> Result<bool, EngineError> {
        if sell_amount <= 0.0 {
            return Ok(false);
        }

        let (Some(best_bid), Some(best_ask)) = (view.best_bid, view.best_ask) else {
            return Ok(false);
        };
        let mid = (best_bid + best_ask) / 2.0;
        let spread = best_ask - best_bid;

        let pnl_pct = if position.avg_price > 0.0 {
            (mid - position.avg_price) / position.avg_price * 100.0
        } else {
            0.0
        };

        let pnl_trigger = position.avg_price > 0.0
            && pnl_pct < policy.stop_loss_threshold
            && spread <= policy.spread_threshold;
        let vol_trigger = market.volatility.h3 > policy.volatility_threshold;

        if !pnl_trigger && !vol_trigger {
            return Ok(false);
        }

        let reason = if pnl_trigger { RiskReason::PnlAndSpread } else { RiskReason::Volatility };
        warn!(
            "[TradingEngine] stop-loss triggered for {} ({:?}): pnl%={:.2} spread={:.4} vol3h={:.2}",
            token, reason, pnl_pct, spread, market.volatility.h3
        );

        self.exchange
            .place(token, ClobSide::Sell, best_bid, position.size, market.neg_risk)
            .await?;
        self.exchange.cancel_all_for_market(&market.condition_id).await?;

        let now = chrono::Utc::now().timestamp();
        let state = RiskState::new(now, policy.sleep_period_hours, reason);
        if let Err(e) = self.risk_state.save(&market.condition_id, &state) {
            warn!("[TradingEngine] failed to persist risk state for {}: {}", market.condition_id, e);
        }

        let _ = role;
        Ok(true)
    }

    /// §4.8f: maker buy quoting, gated by position caps, risk sleep window,
    /// volatility/drift suppression, opposite-side exposure and the final
    /// price-range + rebate-floor guard.
    #[allow(clippy::too_many_arguments)]
    async fn evaluate_buy_path(
        &self,
        market: &MarketRow,
        policy: &PolicyParams,
        role: TokenRole,
        token: &str,
        view: &BookView,
        position: &Position,
        other_position: &Position,
        buy_amount: f64,
        bid: f64,
    ) -> Result<(), EngineError> {
        if !(position.size < market.max_size && position.size < BUY_PATH_POSITION_CAP && buy_amount >= market.min_size)
        {
            return Ok(());
        }

        if let Ok(Some(risk)) = self.risk_state.load(&market.condition_id) {
            let now = chrono::Utc::now().timestamp();
            if risk.is_active(now) {
                debug!("[TradingEngine] {} buy suppressed: risk sleep until {}", token, risk.sleep_till);
                return Ok(());
            }
        }

        let drifted = match view.top_bid {
            Some(top_bid) => (bid - top_bid).abs() >= REFERENCE_DRIFT_MAX,
            None => false,
        };
        if market.volatility.h3 > policy.volatility_threshold || drifted {
            debug!("[TradingEngine] {} buy suppressed: volatility/drift, cancelling", token);
            self.exchange.cancel_all_for_token(token).await?;
            return Ok(());
        }

        if other_position.size > market.min_size {
            let resting_buy = self.stores.orders.read().get(token).buy;
            if !resting_buy.is_empty() {
                debug!("[TradingEngine] {} buy suppressed: opposite-side exposure, cancelling", token);
                self.exchange.cancel_all_for_token(token).await?;
            }
            return Ok(());
        }

        if view.liquidity_ratio() < 0.0 {
            debug!("[TradingEngine] {} buy suppressed: negative liquidity ratio", token);
            return Ok(());
        }

        if !(BID_PRICE_FLOOR..BID_PRICE_CEIL).contains(&bid) {
            return Ok(());
        }

        let Some(mid) = view.mid else { return Ok(()) };
        let rebate_floor = mid - market.max_spread / 100.0;
        if bid < rebate_floor {
            debug!("[TradingEngine] {} buy suppressed: below rebate floor {:.4}", token, rebate_floor);
            return Ok(());
        }

        let resting = self.stores.orders.read().get(token).buy;
        if needs_replace(resting, bid, buy_amount, REPLACE_PRICE_DELTA, REPLACE_SIZE_DELTA_PCT) {
            if !resting.is_empty() {
                self.exchange.cancel_all_for_token(token).await?;
            }
            info!("[TradingEngine] {} ({:?}) placing buy {:.4} x {:.2}", token, role, bid, buy_amount);
            self.exchange.place(token, ClobSide::Buy, bid, buy_amount, market.neg_risk).await?;
        }

        Ok(())
    }

    /// §4.8g: take-profit sell, evaluated only when the risk path didn't
    /// already fire this cycle.
    async fn evaluate_take_profit(
        &self,
        market: &MarketRow,
        policy: &PolicyParams,
        token: &str,
        view: &BookView,
        position: &Position,
        sell_amount: f64,
        ask_from_step_c: f64,
    ) -> Result<(), EngineError> {
        if sell_amount <= 0.0 || position.avg_price <= 0.0 {
            return Ok(());
        }

        let target = ask_from_step_c.max(position.avg_price * (1.0 + policy.take_profit_threshold / 100.0));
        let resting_sell = self.stores.orders.read().get(token).sell;

        let replace = resting_sell.is_empty()
            || (resting_sell.price - target).abs() / target > TAKE_PROFIT_PRICE_DELTA_PCT
            || resting_sell.size < TAKE_PROFIT_SIZE_FRACTION * position.size;

        if !replace {
            return Ok(());
        }

        let _ = view;
        if !resting_sell.is_empty() {
            self.exchange.cancel_all_for_token(token).await?;
        }
        info!("[TradingEngine] {} placing take-profit sell {:.4} x {:.2}", token, target, sell_amount);
        self.exchange.place(token, ClobSide::Sell, target, sell_amount, market.neg_risk).await?;
        Ok(())
    }
}

/// §4.8 step 3 / §8 invariant 10: replace only on a meaningful price or size
/// change, or when nothing is resting yet.
fn needs_replace(resting: RestingOrder, target_price: f64, target_size: f64, price_delta: f64, size_delta_pct: f64) -> bool {
    if resting.is_empty() {
        return true;
    }
    let price_moved = (resting.price - target_price).abs() > price_delta;
    let size_moved = target_size > 0.0 && (resting.size - target_size).abs() / target_size > size_delta_pct;
    price_moved || size_moved
}

/// Unused directly but kept so call sites that only care about "is there a
/// resting order on this side" don't need to know `EngineSide` exists.
#[allow(dead_code)]
type _SideAlias = EngineSide;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_config::VolatilityRow;
    use crate::infrastructure::client::exchange_adapter::{
        ExchangeError, ExchangeOrderRow, ExchangePositionRow, PlaceAck,
    };
    use crate::infrastructure::client::user::{OrderBookStore, PendingTracker};
    use ethers::types::{TxHash, U256};
    use parking_lot::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeExchange {
        placed: Mutex<Vec<(String, ClobSide, f64, f64)>>,
        cancels_token: Mutex<Vec<String>>,
        cancels_market: Mutex<Vec<String>>,
        raw_balance: Mutex<HashMap<String, U256>>,
        merge_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ExchangeAdapter for FakeExchange {
        async fn place(
            &self,
            token: &str,
            side: ClobSide,
            price: f64,
            size: f64,
            _neg_risk: bool,
        ) -> Result<PlaceAck, ExchangeError> {
            self.placed.lock().unwrap().push((token.to_string(), side, price, size));
            Ok(PlaceAck { order_id: "o1".into(), status: Some("LIVE".into()) })
        }

        async fn cancel_all_for_token(&self, token: &str) -> Result<(), ExchangeError> {
            self.cancels_token.lock().unwrap().push(token.to_string());
            Ok(())
        }

        async fn cancel_all_for_market(&self, condition_id: &str) -> Result<(), ExchangeError> {
            self.cancels_market.lock().unwrap().push(condition_id.to_string());
            Ok(())
        }

        async fn get_positions(&self) -> Result<Vec<(String, ExchangePositionRow)>, ExchangeError> {
            Ok(vec![])
        }

        async fn get_open_orders(&self) -> Result<Vec<(String, ExchangeOrderRow)>, ExchangeError> {
            Ok(vec![])
        }

        async fn get_raw_balance(&self, token: &str, _neg_risk: bool) -> Result<U256, ExchangeError> {
            Ok(self.raw_balance.lock().unwrap().get(token).copied().unwrap_or_default())
        }

        async fn get_usdc_balance(&self) -> Result<f64, ExchangeError> {
            Ok(0.0)
        }

        async fn merge(&self, _raw_amount: U256, _condition_id: &str, _neg_risk: bool) -> Result<TxHash, ExchangeError> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TxHash::zero())
        }
    }

    fn market() -> MarketRow {
        MarketRow {
            condition_id: "c1".into(),
            token1: "yes1".into(),
            token2: "no1".into(),
            tick_size: 0.01,
            min_size: 20.0,
            max_spread: 3.0,
            neg_risk: false,
            trade_size: 50.0,
            max_size: 500.0,
            multiplier: None,
            param_type: "default".into(),
            volatility: VolatilityRow::default(),
        }
    }

    fn engine(exchange: Arc<FakeExchange>) -> (TradingEngine<FakeExchange>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let stores = TradingEngineStores {
            books: Arc::new(RwLock::new(OrderBookStore::new())),
            positions: Arc::new(RwLock::new(PositionStore::new())),
            orders: Arc::new(RwLock::new(OrderStore::new())),
            markets: Arc::new(RwLock::new(MarketConfigStore::new())),
        };
        let mut pending = PendingTracker::new();
        stores.markets.write().refresh(vec![market()], Default::default(), &mut pending);

        let risk_state = RiskStateStore::new(dir.path());
        (TradingEngine::new(stores, exchange, risk_state), dir)
    }

    fn level(price: &str, size: &str) -> crate::domain::orderbook::PriceLevel {
        crate::domain::orderbook::PriceLevel { price: price.to_string(), size: size.to_string() }
    }

    #[tokio::test]
    async fn thin_book_join_does_not_improve_price() {
        let exchange = Arc::new(FakeExchange::default());
        let (engine, _dir) = engine(exchange.clone());
        engine.stores.books.write().apply_snapshot(
            "yes1",
            &[level("0.42", "10")],
            &[level("0.44", "200")],
        );

        engine.run_market_pass("c1").await.unwrap();

        let placed = exchange.placed.lock().unwrap();
        let buy = placed.iter().find(|(_, side, ..)| matches!(side, ClobSide::Buy));
        assert_eq!(buy.map(|(_, _, price, _)| *price), Some(0.42));
    }

    #[tokio::test]
    async fn bid_crossing_ask_resets_to_top_of_book() {
        let exchange = Arc::new(FakeExchange::default());
        let (engine, _dir) = engine(exchange.clone());
        engine.stores.books.write().apply_snapshot(
            "yes1",
            &[level("0.50", "200")],
            &[level("0.51", "200")],
        );

        engine.run_market_pass("c1").await.unwrap();

        let placed = exchange.placed.lock().unwrap();
        let buy = placed.iter().find(|(_, side, ..)| matches!(side, ClobSide::Buy));
        assert_eq!(buy.map(|(_, _, price, _)| *price), Some(0.50));
    }

    #[tokio::test]
    async fn stop_loss_sells_at_best_bid_and_cancels_market() {
        let exchange = Arc::new(FakeExchange::default());
        let (engine, _dir) = engine(exchange.clone());
        engine.stores.books.write().apply_snapshot(
            "yes1",
            &[level("0.60", "200")],
            &[level("0.61", "200")],
        );
        engine.stores.positions.write().apply_fill("yes1", crate::infrastructure::client::user::position_store::FillSide::Buy, 100.0, 0.70);

        engine.run_market_pass("c1").await.unwrap();

        let placed = exchange.placed.lock().unwrap();
        let sell = placed.iter().find(|(_, side, ..)| matches!(side, ClobSide::Sell));
        assert_eq!(sell.map(|(_, _, price, size)| (*price, *size)), Some((0.60, 100.0)));
        assert_eq!(exchange.cancels_market.lock().unwrap().len(), 1);

        let risk = engine.risk_state.load("c1").unwrap();
        assert!(risk.is_some());
    }

    #[tokio::test]
    async fn stop_loss_does_not_fire_on_volatility_alone_with_no_position() {
        let exchange = Arc::new(FakeExchange::default());
        let (engine, _dir) = engine(exchange.clone());
        let mut high_vol_market = market();
        high_vol_market.volatility.h3 = 999.0;
        engine.stores.markets.write().refresh(vec![high_vol_market], Default::default(), &mut PendingTracker::new());
        engine.stores.books.write().apply_snapshot(
            "yes1",
            &[level("0.60", "200")],
            &[level("0.61", "200")],
        );

        engine.run_market_pass("c1").await.unwrap();

        let placed = exchange.placed.lock().unwrap();
        assert!(placed.iter().all(|(_, side, ..)| !matches!(side, ClobSide::Sell)));
        assert_eq!(exchange.cancels_market.lock().unwrap().len(), 0);
        assert!(engine.risk_state.load("c1").unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_unwinds_offsetting_exposure() {
        let exchange = Arc::new(FakeExchange::default());
        exchange.raw_balance.lock().unwrap().insert("yes1".into(), U256::from(120_000_000u64));
        exchange.raw_balance.lock().unwrap().insert("no1".into(), U256::from(80_000_000u64));
        let (engine, _dir) = engine(exchange.clone());

        engine.stores.positions.write().apply_fill("yes1", crate::infrastructure::client::user::position_store::FillSide::Buy, 120.0, 0.40);
        engine.stores.positions.write().apply_fill("no1", crate::infrastructure::client::user::position_store::FillSide::Buy, 80.0, 0.55);

        let market = market();
        engine.merge_offsetting_exposure(&market).await.unwrap();

        assert_eq!(exchange.merge_calls.load(Ordering::SeqCst), 1);
        let pos1 = engine.stores.positions.read().get("yes1");
        let pos2 = engine.stores.positions.read().get("no1");
        assert_eq!(pos1.size, 40.0);
        assert_eq!(pos2.size, 0.0);
        assert_eq!(pos1.avg_price, 0.40);
    }

    #[test]
    fn needs_replace_respects_both_thresholds() {
        let resting = RestingOrder { price: 0.40, size: 50.0 };
        assert!(!needs_replace(resting, 0.402, 52.0, 0.005, 0.10));
        assert!(needs_replace(resting, 0.41, 50.0, 0.005, 0.10));
        assert!(needs_replace(resting, 0.40, 60.0, 0.005, 0.10));
        assert!(needs_replace(RestingOrder::default(), 0.40, 50.0, 0.005, 0.10));
    }
}
