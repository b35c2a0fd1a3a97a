//! Order Store - at-most-one resting order per side per token
//!
//! Unlike a general order book, the engine only ever rests a single GTC order
//! per side per token (see `TradingEngine`'s idempotent replace logic), so the
//! store models exactly that: `{buy, sell}` slots per token, not an indexed
//! collection of individual order IDs.
//!
//! Grounded in `data_utils.py`'s `update_orders`/`get_order`/`set_order`. That
//! code's `update_orders` collapses more than one resting order per side into
//! a cancel-all-and-reset, a quirk preserved here in `refresh_from_exchange`.
//! `set_order` there replaces the whole per-token record with only the
//! touched side (dropping the other side) - read as a bug rather than
//! intent, since it contradicts `set(token, side, ...)`'s implied per-side
//! update; this store's `set` updates only the touched side and leaves the
//! other alone.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Domain-level trade/order side (BUY or SELL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }

    /// Flip BUY<->SELL. Used for the maker/taker inversion in the event router.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Resting order record for one side of one token.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RestingOrder {
    pub price: f64,
    pub size: f64,
}

impl RestingOrder {
    pub fn is_empty(&self) -> bool {
        self.size <= 0.0
    }
}

/// The two resting-order slots for a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOrders {
    pub buy: RestingOrder,
    pub sell: RestingOrder,
}

impl TokenOrders {
    pub fn side(&self, side: Side) -> RestingOrder {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }
}

/// A single resting order as reported by the exchange (REST snapshot).
#[derive(Debug, Clone)]
pub struct ExchangeOrder {
    pub order_id: String,
    pub side: Side,
    pub price: f64,
    pub remaining_size: f64,
}

/// Thread-safe shared handle.
pub type SharedOrderStore = Arc<RwLock<OrderStore>>;

pub struct OrderStore {
    orders: HashMap<String, TokenOrders>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self { orders: HashMap::new() }
    }

    /// Current state for a token, defaulting to both sides empty.
    pub fn get(&self, token: &str) -> TokenOrders {
        self.orders.get(token).copied().unwrap_or_default()
    }

    /// Update only the touched side, leaving the other side's resting order
    /// untouched.
    pub fn set(&mut self, token: &str, side: Side, price: f64, size: f64) {
        let entry = self.orders.entry(token.to_string()).or_default();
        let slot = match side {
            Side::Buy => &mut entry.buy,
            Side::Sell => &mut entry.sell,
        };
        *slot = RestingOrder { price, size };
    }

    /// Reset a single side to empty (used on cancel, or on the
    /// more-than-one-resting-order collapse below).
    pub fn clear(&mut self, token: &str, side: Side) {
        self.set(token, side, 0.0, 0.0);
    }

    /// Rebuild a token's resting orders from a REST snapshot.
    ///
    /// If more than one order exists on the same side, the whole side is
    /// reset to `{price: 0, size: 0}` immediately and that side is returned
    /// in the collapsed-sides list - mirroring the Python original's
    /// `update_orders`, which issues a cancel-all for the token and clears
    /// its in-memory record in the same pass rather than waiting for
    /// cancellation confirmations. Clearing the in-memory record alone is
    /// not enough (§4.3/§7/§8 invariant 4): the caller must still route the
    /// returned sides through `ExchangeAdapter::cancel_all_for_token` so the
    /// stale duplicate orders don't stay live on the exchange.
    #[must_use]
    pub fn refresh_from_exchange(&mut self, token: &str, exchange_orders: &[ExchangeOrder]) -> Vec<Side> {
        let mut buys: Vec<&ExchangeOrder> = Vec::new();
        let mut sells: Vec<&ExchangeOrder> = Vec::new();
        for o in exchange_orders {
            match o.side {
                Side::Buy => buys.push(o),
                Side::Sell => sells.push(o),
            }
        }

        let mut collapsed = Vec::new();
        let mut resolve = |side: Side, group: Vec<&ExchangeOrder>| -> RestingOrder {
            match group.len() {
                0 => RestingOrder::default(),
                1 => RestingOrder { price: group[0].price, size: group[0].remaining_size },
                _ => {
                    collapsed.push(side);
                    RestingOrder::default()
                }
            }
        };

        let buy = resolve(Side::Buy, buys);
        let sell = resolve(Side::Sell, sells);
        let entry = self.orders.entry(token.to_string()).or_default();
        entry.buy = buy;
        entry.sell = sell;
        collapsed
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_one_side_preserves_the_other() {
        let mut store = OrderStore::new();
        store.set("tok", Side::Buy, 0.45, 100.0);
        store.set("tok", Side::Sell, 0.55, 50.0);

        let entry = store.get("tok");
        assert_eq!(entry.buy, RestingOrder { price: 0.45, size: 100.0 });
        assert_eq!(entry.sell, RestingOrder { price: 0.55, size: 50.0 });
    }

    #[test]
    fn refresh_single_order_per_side() {
        let mut store = OrderStore::new();
        let collapsed = store.refresh_from_exchange(
            "tok",
            &[ExchangeOrder { order_id: "o1".into(), side: Side::Buy, price: 0.4, remaining_size: 25.0 }],
        );
        let entry = store.get("tok");
        assert_eq!(entry.buy, RestingOrder { price: 0.4, size: 25.0 });
        assert!(entry.sell.is_empty());
        assert!(collapsed.is_empty());
    }

    #[test]
    fn refresh_collapses_multiple_orders_on_one_side_and_reports_it() {
        let mut store = OrderStore::new();
        store.set("tok", Side::Buy, 0.4, 25.0);
        let collapsed = store.refresh_from_exchange(
            "tok",
            &[
                ExchangeOrder { order_id: "o1".into(), side: Side::Buy, price: 0.4, remaining_size: 25.0 },
                ExchangeOrder { order_id: "o2".into(), side: Side::Buy, price: 0.41, remaining_size: 10.0 },
            ],
        );
        let entry = store.get("tok");
        assert!(entry.buy.is_empty());
        assert_eq!(collapsed, vec![Side::Buy]);
    }
}
