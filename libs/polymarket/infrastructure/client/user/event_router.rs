//! Event Router - wires market-socket and user-socket messages into the
//! quoting-engine stores (C7)
//!
//! Two independent message streams land here:
//!
//! - The market socket's `book`/`price_change` events, which only ever touch
//!   `OrderBookStore` and then ask the scheduler to re-run a trading pass for
//!   the owning market (a book move can change the target quote price even
//!   with no fill).
//! - The user socket's `trade`/`order` events, which drive the
//!   optimistic-then-terminal fill protocol: a `MATCHED` trade is applied to
//!   `PositionStore` and marked pending immediately, `CONFIRMED`/`MINED`
//!   clears the pending marker, and `FAILED` clears it and asks for a
//!   reconcile pass instead of trusting the optimistic apply.
//!
//! A `trade` message's top-level `side`/`size`/`price` are the taker's. When
//! this process rested as maker (its own maker address appears in
//! `maker_orders`), accounting must switch to that specific maker order's
//! `outcome`/`matched_amount`/`price` rather than the taker's aggregate -
//! mirroring the Python original's `process_trade_message`
//! (`data_processing.py:106-115`): if the maker order's outcome matches the
//! trade's outcome, the side inverts (same token, opposite side of the
//! taker); if the outcomes differ, the token flips to its sibling (YES<->NO)
//! and the side is kept as the taker's.
//!
//! Grounded in the Python original's websocket message dispatch in
//! `main.py`/`data_utils.py`; the store APIs it drives were built first and
//! are exercised directly here rather than duplicated.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::orderbook::PriceLevel;

use super::market_config_store::MarketConfigStore;
use super::order_book_store::OrderBookStore;
use super::order_store::{ExchangeOrder, OrderStore, Side};
use super::pending_tracker::{pending_column, PendingTracker};
use super::position_store::{FillSide, PositionStore};
use super::types::{MakerOrder, OrderMessage, OrderType, TradeMessage, TradeStatus, UserMessage};

/// A market-socket event, already decoded from the wire message.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// Full snapshot of both ladders for one asset.
    Book {
        asset_id: String,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// One incremental level update.
    PriceChange {
        asset_id: String,
        side: Side,
        price: f64,
        size: f64,
    },
}

/// Decouples the router from `TradingEngine` (§4.8), which is driven by
/// these calls rather than polling the stores on a timer. Implemented by the
/// live engine; trivially faked in tests.
#[async_trait::async_trait]
pub trait TradePassScheduler: Send + Sync {
    /// Ask the engine to re-evaluate quotes for the market owning `token`.
    async fn schedule_trade_pass(&self, token: &str);

    /// Ask the Reconciler to run an out-of-band reconcile for `token`
    /// immediately, rather than waiting for its next tick - used after a
    /// `FAILED` trade status, where the optimistic apply must be unwound
    /// from the authoritative source rather than guessed locally.
    async fn schedule_reconcile(&self, token: &str);
}

/// The stores the router mutates in place.
pub struct EventRouterStores {
    pub books: Arc<RwLock<OrderBookStore>>,
    pub positions: Arc<RwLock<PositionStore>>,
    pub orders: Arc<RwLock<OrderStore>>,
    pub pending: Arc<RwLock<PendingTracker>>,
    pub markets: Arc<RwLock<MarketConfigStore>>,
}

/// Routes decoded market-socket and user-socket messages into the stores.
pub struct EventRouter<S: TradePassScheduler> {
    stores: EventRouterStores,
    scheduler: S,
    /// This process's own on-chain maker address, for the taker/maker
    /// inversion check on trade messages.
    maker_address: String,
    /// Tokens seen in a message but missing from `MarketConfigStore` -
    /// logged once each rather than once per message, so a single
    /// unrecognized token doesn't flood the log while its market config is
    /// still propagating.
    unknown_tokens: RwLock<HashSet<String>>,
}

impl<S: TradePassScheduler> EventRouter<S> {
    pub fn new(stores: EventRouterStores, scheduler: S, maker_address: String) -> Self {
        Self {
            stores,
            scheduler,
            maker_address,
            unknown_tokens: RwLock::new(HashSet::new()),
        }
    }

    /// True if `token` belongs to a known market; logs once per unrecognized
    /// token the first time it's seen.
    fn known_token(&self, token: &str) -> bool {
        if self.stores.markets.read().locate(token).is_some() {
            return true;
        }
        let mut unknown = self.unknown_tokens.write();
        if unknown.insert(token.to_string()) {
            warn!("[EventRouter] message for unrecognized token {}, dropping", token);
        }
        false
    }

    /// Handle one market-socket event: update the book, then ask for a
    /// trading pass since a book move alone can change the target quote.
    pub async fn handle_market_event(&self, event: MarketEvent) {
        match event {
            MarketEvent::Book { asset_id, bids, asks } => {
                if !self.known_token(&asset_id) {
                    return;
                }
                self.stores.books.write().apply_snapshot(&asset_id, &bids, &asks);
                self.scheduler.schedule_trade_pass(&asset_id).await;
            }
            MarketEvent::PriceChange { asset_id, side, price, size } => {
                if !self.known_token(&asset_id) {
                    return;
                }
                self.stores.books.write().apply_delta(&asset_id, side, price, size);
                self.scheduler.schedule_trade_pass(&asset_id).await;
            }
        }
    }

    /// Handle one decoded user-socket message.
    pub async fn handle_user_message(&self, message: UserMessage) {
        match message {
            UserMessage::Trade(trade) => self.handle_trade(trade).await,
            UserMessage::Order(order) => self.handle_order(order).await,
            UserMessage::Pong => {}
            UserMessage::Unknown(raw) => debug!("[EventRouter] unrecognized user message: {}", raw),
        }
    }

    async fn handle_trade(&self, trade: TradeMessage) {
        if !self.known_token(&trade.asset_id) {
            return;
        }

        let Some(taker_side) = Side::from_str(&trade.side) else {
            warn!("[EventRouter] trade {} has unparseable side {:?}", trade.id, trade.side);
            return;
        };

        let Some((token, fill_side, size, price)) = self.resolve_fill(&trade, taker_side) else {
            warn!(
                "[EventRouter] trade {} rested as maker with outcome mismatch but sibling token is unknown, dropping",
                trade.id
            );
            return;
        };

        let column = pending_column(&token, &side_str(fill_side));

        match trade.trade_status() {
            TradeStatus::Matched => {
                let position_side = match fill_side {
                    Side::Buy => FillSide::Buy,
                    Side::Sell => FillSide::Sell,
                };
                self.stores.positions.write().apply_fill(&token, position_side, size, price);
                self.stores.pending.write().add(&column, &trade.id);
                self.scheduler.schedule_trade_pass(&token).await;
            }
            TradeStatus::Confirmed | TradeStatus::Mined => {
                self.stores.pending.write().remove(&column, &trade.id);
            }
            TradeStatus::Failed => {
                self.stores.pending.write().remove(&column, &trade.id);
                self.scheduler.schedule_reconcile(&token).await;
            }
            TradeStatus::Retrying => {
                debug!("[EventRouter] trade {} retrying", trade.id);
            }
        }
    }

    /// Resolve the token/side/size/price this process should account for a
    /// trade under, per `data_processing.py:106-115`. Returns `None` only
    /// when this process rested as maker with a mismatched outcome and the
    /// sibling token can't be located (config not yet propagated).
    fn resolve_fill(&self, trade: &TradeMessage, taker_side: Side) -> Option<(String, Side, f64, f64)> {
        let maker_order = trade
            .maker_orders
            .iter()
            .find(|m| m.maker_address.as_deref() == Some(self.maker_address.as_str()));

        let Some(maker_order) = maker_order else {
            let price: f64 = trade.price.parse().unwrap_or(0.0);
            let size: f64 = trade.size.parse().unwrap_or(0.0);
            return Some((trade.asset_id.clone(), taker_side, size, price));
        };

        let price: f64 = maker_order.price.parse().unwrap_or(0.0);
        let size: f64 = maker_order.matched_amount.parse().unwrap_or(0.0);

        if maker_order.outcome == trade.outcome {
            Some((trade.asset_id.clone(), taker_side.opposite(), size, price))
        } else {
            let sibling = self.stores.markets.read().sibling_of(&trade.asset_id)?.to_string();
            Some((sibling, taker_side, size, price))
        }
    }

    async fn handle_order(&self, order: OrderMessage) {
        let token = order.asset_id.clone();
        if !self.known_token(&token) {
            return;
        }

        let Some(side) = Side::from_str(&order.side) else {
            warn!("[EventRouter] order {} has unparseable side {:?}", order.id, order.side);
            return;
        };

        match order.order_type() {
            OrderType::Cancellation => {
                self.stores.orders.write().clear(&token, side);
            }
            OrderType::Placement | OrderType::Update => {
                let original: f64 = order.original_size.parse().unwrap_or(0.0);
                let matched: f64 = order.size_matched.parse().unwrap_or(0.0);
                let price: f64 = order.price.parse().unwrap_or(0.0);
                let remaining = (original - matched).max(0.0);
                self.stores.orders.write().set(&token, side, price, remaining);
            }
        }

        self.scheduler.schedule_trade_pass(&token).await;
    }

    /// Reconstruct the `ExchangeOrder` view of a resting order the exchange
    /// reports, for callers bridging REST hydration through the same path
    /// the reconcile loop uses (§4.6 hands `ExchangeOrder`s to `OrderStore`
    /// directly; the router never needs this itself but exposes it so a
    /// caller hydrating from `GET /orders` at startup can share the type).
    pub fn exchange_order_from_message(order: &OrderMessage, side: Side) -> ExchangeOrder {
        let original: f64 = order.original_size.parse().unwrap_or(0.0);
        let matched: f64 = order.size_matched.parse().unwrap_or(0.0);
        ExchangeOrder {
            order_id: order.id.clone(),
            side,
            price: order.price.parse().unwrap_or(0.0),
            remaining_size: (original - matched).max(0.0),
        }
    }
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}
