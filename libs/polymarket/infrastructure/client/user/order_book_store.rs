//! Order Book Store - per-asset ladders for the quoting engine (C1)
//!
//! Thin wrapper over `domain::orderbook::Orderbook`, which already does the
//! sorted-ladder/micros bookkeeping; this store adds the multi-asset map and
//! an f64-facing API so `TradingEngine` never touches micros directly.
//! Grounded in `infrastructure::client::clob::sniper_ws::SharedOrderbooks`
//! for the "map of asset -> Orderbook" shape, generalized to the decimal
//! price semantics §4.1 needs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::orderbook::{micros_to_f64, price_to_micros, Orderbook, PriceLevel};

use super::order_store::Side;

/// Thread-safe shared handle.
pub type SharedOrderBookStore = Arc<RwLock<OrderBookStore>>;

/// f64-denominated result of a min-size-filtered scan of one side, plus the
/// unconditional top of book - the decimal analogue of `domain::orderbook::BestLevels`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestQuote {
    pub best_price: Option<f64>,
    pub best_size: Option<f64>,
    pub second_best_price: Option<f64>,
    pub second_best_size: Option<f64>,
    pub top_price: Option<f64>,
    pub top_size: Option<f64>,
}

pub struct OrderBookStore {
    books: HashMap<String, Orderbook>,
}

impl OrderBookStore {
    pub fn new() -> Self {
        Self { books: HashMap::new() }
    }

    fn book_mut(&mut self, asset: &str) -> &mut Orderbook {
        self.books
            .entry(asset.to_string())
            .or_insert_with(|| Orderbook::new(asset.to_string()))
    }

    /// Replace both ladders atomically from a `book` event.
    pub fn apply_snapshot(&mut self, asset: &str, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.book_mut(asset).process_snapshot(bids, asks);
    }

    /// Apply one `price_change` delta; `size == 0.0` removes the level.
    pub fn apply_delta(&mut self, asset: &str, side: Side, price: f64, size: f64) {
        let side_str = match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        self.book_mut(asset)
            .process_update(side_str, &price.to_string(), &size.to_string());
    }

    /// §4.1 `best_with_min_size`: first level clearing `min_size`, the next
    /// qualifying level after it, and the unconditional top of book.
    pub fn best_with_min_size(&self, asset: &str, side: Side, min_size: f64) -> BestQuote {
        let Some(book) = self.books.get(asset) else {
            return BestQuote::default();
        };
        let ladder = match side {
            Side::Buy => &book.bids,
            Side::Sell => &book.asks,
        };
        let found = ladder.best_with_min_size(price_to_micros(&min_size.to_string()));

        BestQuote {
            best_price: found.best.map(|(p, _)| micros_to_f64(p)),
            best_size: found.best.map(|(_, s)| micros_to_f64(s)),
            second_best_price: found.second_best.map(|(p, _)| micros_to_f64(p)),
            second_best_size: found.second_best.map(|(_, s)| micros_to_f64(s)),
            top_price: found.top.map(|(p, _)| micros_to_f64(p)),
            top_size: found.top.map(|(_, s)| micros_to_f64(s)),
        }
    }

    /// Sum of resting size whose price falls within `[lo, hi]` inclusive, for
    /// the ±10%-of-mid liquidity ratio in §4.8a.
    pub fn depth_within(&self, asset: &str, side: Side, lo: f64, hi: f64) -> f64 {
        let Some(book) = self.books.get(asset) else {
            return 0.0;
        };
        let ladder = match side {
            Side::Buy => &book.bids,
            Side::Sell => &book.asks,
        };
        micros_to_f64(ladder.depth_within(
            price_to_micros(&lo.to_string()),
            price_to_micros(&hi.to_string()),
        ))
    }
}

impl Default for OrderBookStore {
    fn default() -> Self {
        Self::new()
    }
}
