//! Quote pricing and order sizing (§4.8c/d).

use crate::domain::market_config::MarketRow;

/// §4.8c: improve the qualifying level by one tick, unless the level behind
/// it is too thin to justify improving on - in which case just join it. Then
/// clamp out the degenerate cases (crossed quotes, equal bid/ask, selling
/// below cost).
pub fn target_quote_prices(
    best_bid: f64,
    best_bid_size: f64,
    best_ask: f64,
    best_ask_size: f64,
    top_bid: f64,
    top_ask: f64,
    avg_price: f64,
    tick: f64,
    min_size: f64,
) -> (f64, f64) {
    let mut bid = best_bid + tick;
    let mut ask = best_ask - tick;

    if best_bid_size < 1.5 * min_size {
        bid = best_bid;
    }
    if best_ask_size < 1.5 * 250.0 {
        ask = best_ask;
    }

    if bid >= top_ask {
        bid = top_bid;
    }
    if ask <= top_bid {
        ask = top_ask;
    }
    if (bid - ask).abs() < 1e-9 {
        bid = top_bid;
        ask = top_ask;
    }
    if avg_price > 0.0 && ask <= avg_price {
        ask = avg_price;
    }

    (bid, ask)
}

/// §4.8d: buy/sell order sizes for one leg, given this leg's position and the
/// sibling leg's position (used only to decide whether the book is already
/// saturated on both sides at `max_size`).
pub fn buy_sell_amounts(pos: f64, other_pos: f64, market: &MarketRow, bid: f64) -> (f64, f64) {
    let trade_size = market.trade_size;
    let max_size = market.max_size;
    let min_size = market.min_size;

    let (mut buy_amount, sell_amount) = if pos < max_size {
        let buy = trade_size.min(max_size - pos);
        let sell = if pos >= trade_size { trade_size.min(pos) } else { 0.0 };
        (buy, sell)
    } else {
        let sell = trade_size.min(pos);
        let total_exposure = pos + other_pos;
        let buy = if total_exposure < 2.0 * max_size { trade_size } else { 0.0 };
        (buy, sell)
    };

    if buy_amount >= 0.7 * min_size && buy_amount < min_size {
        buy_amount = min_size;
    }

    if bid < 0.1 {
        if let Some(multiplier) = market.multiplier {
            buy_amount *= multiplier;
        }
    }

    (buy_amount, sell_amount)
}
