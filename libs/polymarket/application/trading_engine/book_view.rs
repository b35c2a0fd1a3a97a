//! Token1/Token2 book-view transform (§4.8a/b, §9 "Token1/Token2 symmetry")
//!
//! The NO leg of a market is never read from its own order book in this
//! engine - its quoting inputs are a pure function of the YES ladder via
//! `p -> 1-p` with bid/ask roles swapped, so the pricing code in `sizing.rs`
//! only has to be written once and simply gets called twice per market.

use crate::domain::market_config::TokenRole;
use crate::infrastructure::client::user::order_book_store::{BestQuote, OrderBookStore};
use crate::infrastructure::client::user::order_store::Side;

/// Depth-filtered top-of-book plus the unconditional top, for one quoting
/// pass over one leg of a market.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookView {
    pub top_bid: Option<f64>,
    pub top_bid_size: Option<f64>,
    pub best_bid: Option<f64>,
    pub best_bid_size: Option<f64>,
    pub top_ask: Option<f64>,
    pub top_ask_size: Option<f64>,
    pub best_ask: Option<f64>,
    pub best_ask_size: Option<f64>,
    pub mid: Option<f64>,
    pub depth_bid: f64,
    pub depth_ask: f64,
}

impl BookView {
    /// `depth_bid / depth_ask` within ±10% of mid; 0 when the ask side has
    /// no depth to divide by (§4.8a).
    pub fn liquidity_ratio(&self) -> f64 {
        if self.depth_ask <= 0.0 {
            0.0
        } else {
            self.depth_bid / self.depth_ask
        }
    }
}

/// Prefer the size-qualifying level; fall back to the looser filter; fall
/// back again to the unconditional top when neither qualifies (a market with
/// only sub-`min_size` resting interest still has *something* to join).
fn pick(primary: BestQuote, fallback: BestQuote) -> (Option<f64>, Option<f64>) {
    if let (Some(p), Some(s)) = (primary.best_price, primary.best_size) {
        return (Some(p), Some(s));
    }
    if let (Some(p), Some(s)) = (fallback.best_price, fallback.best_size) {
        return (Some(p), Some(s));
    }
    (fallback.top_price, fallback.top_size)
}

fn invert(p: Option<f64>) -> Option<f64> {
    p.map(|v| 1.0 - v)
}

/// Build the book view for `role`'s leg of a market whose YES asset is
/// `token1`, scanning the shared book store for `token1` only - the NO leg
/// is always derived, never looked up directly.
pub fn book_view_for(
    books: &OrderBookStore,
    token1: &str,
    role: TokenRole,
    primary_min_size: f64,
    fallback_min_size: f64,
) -> BookView {
    let bid_primary = books.best_with_min_size(token1, Side::Buy, primary_min_size);
    let bid_fallback = books.best_with_min_size(token1, Side::Buy, fallback_min_size);
    let ask_primary = books.best_with_min_size(token1, Side::Sell, primary_min_size);
    let ask_fallback = books.best_with_min_size(token1, Side::Sell, fallback_min_size);

    let (best_bid, best_bid_size) = pick(bid_primary, bid_fallback);
    let (best_ask, best_ask_size) = pick(ask_primary, ask_fallback);
    let top_bid = bid_primary.top_price;
    let top_bid_size = bid_primary.top_size;
    let top_ask = ask_primary.top_price;
    let top_ask_size = ask_primary.top_size;

    let mid = match (top_bid, top_ask) {
        (Some(b), Some(a)) => Some((b + a) / 2.0),
        _ => None,
    };

    let (depth_bid, depth_ask) = match mid {
        Some(mid) => {
            let lo = mid * 0.9;
            let hi = mid * 1.1;
            (books.depth_within(token1, Side::Buy, lo, hi), books.depth_within(token1, Side::Sell, lo, hi))
        }
        None => (0.0, 0.0),
    };

    let yes_view = BookView {
        top_bid,
        top_bid_size,
        best_bid,
        best_bid_size,
        top_ask,
        top_ask_size,
        best_ask,
        best_ask_size,
        mid,
        depth_bid,
        depth_ask,
    };

    match role {
        TokenRole::Token1 => yes_view,
        TokenRole::Token2 => mirror(yes_view),
    }
}

fn mirror(yes: BookView) -> BookView {
    BookView {
        top_bid: invert(yes.top_ask),
        top_bid_size: yes.top_ask_size,
        best_bid: invert(yes.best_ask),
        best_bid_size: yes.best_ask_size,
        top_ask: invert(yes.top_bid),
        top_ask_size: yes.top_bid_size,
        best_ask: invert(yes.best_bid),
        best_ask_size: yes.best_bid_size,
        mid: invert(yes.mid),
        depth_bid: yes.depth_ask,
        depth_ask: yes.depth_bid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: &str, size: &str) -> crate::domain::orderbook::PriceLevel {
        crate::domain::orderbook::PriceLevel { price: price.to_string(), size: size.to_string() }
    }

    #[test]
    fn token2_view_mirrors_token1_book() {
        let mut books = OrderBookStore::new();
        books.apply_snapshot("yes1", &[level("0.40", "200")], &[level("0.42", "200")]);

        let yes = book_view_for(&books, "yes1", TokenRole::Token1, 100.0, 20.0);
        let no = book_view_for(&books, "yes1", TokenRole::Token2, 100.0, 20.0);

        assert_eq!(yes.best_bid, Some(0.40));
        assert_eq!(no.best_bid, Some(1.0 - 0.42));
        assert_eq!(no.best_ask, Some(1.0 - 0.40));
        assert_eq!(no.best_bid_size, yes.best_ask_size);
    }

    #[test]
    fn thin_only_level_falls_back_to_top() {
        let mut books = OrderBookStore::new();
        books.apply_snapshot("yes1", &[level("0.42", "10")], &[]);

        let view = book_view_for(&books, "yes1", TokenRole::Token1, 100.0, 20.0);
        assert_eq!(view.best_bid, Some(0.42));
        assert_eq!(view.best_bid_size, Some(10.0));
    }

    #[test]
    fn empty_book_has_no_mid_or_depth() {
        let books = OrderBookStore::new();
        let view = book_view_for(&books, "yes1", TokenRole::Token1, 100.0, 20.0);
        assert_eq!(view.mid, None);
        assert_eq!(view.liquidity_ratio(), 0.0);
    }
}
