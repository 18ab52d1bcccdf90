//! MatchingEngine: consumes a taker order and an OrderBook,
//! produces trades plus the taker's residual quantity.
//!
//! Grounded in `services/matching/orderbook.rs`'s `match_order` loop
//! (walk price levels best-first, drain each level's queue front-to-back,
//! stop when the taker is filled or the book no longer crosses), adapted
//! to call out to `OrderBook::next_match`/`consume` so the book stays a
//! pure data structure (see `orderbook::book` module docs) and to add a
//! self-trade skip that loop does not have.

use chrono::Utc;
use uuid::Uuid;

use crate::models::order::{Order, OrderSide};
use crate::models::trade::Trade;
use crate::orderbook::OrderBook;

/// The absolute fill state of one matched maker order after a single
/// trade, carrying its original `quantity` alongside the post-trade
/// remaining amount so the caller can compute `filled_quantity` for
/// persistence without a separate DB read.
#[derive(Debug, Clone)]
pub struct MakerFill {
    pub order_id: Uuid,
    pub original_quantity: i64,
    pub remaining_quantity: i64,
}

impl MakerFill {
    pub fn filled_quantity(&self) -> i64 {
        self.original_quantity - self.remaining_quantity
    }
}

/// Result of matching one taker order against a book.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub trades: Vec<Trade>,
    /// One entry per trade, in the same order as `trades`, describing the
    /// maker's fill state immediately after that trade.
    pub maker_fills: Vec<MakerFill>,
    /// Quantity still unfilled after matching; the taker rests with this
    /// quantity if greater than zero: there is no market-order semantics
    /// here, so a limit order always rests its residual rather than cancelling.
    pub taker_remaining: i64,
}

pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        MatchingEngine
    }

    /// Matches `taker` against `book`. Does not mutate `taker` or persist
    /// anything; the caller (OrderSubmitService) is responsible for
    /// applying `taker_remaining` to the taker's own record and for
    /// inserting any residual into the book.
    pub fn match_order(&self, taker: &Order, book: &OrderBook) -> MatchResult {
        let mut remaining = taker.remaining();
        let mut trades = Vec::new();
        let mut maker_fills = Vec::new();
        let now = Utc::now();

        while remaining > 0 {
            let Some(maker) = book.next_match(taker.side, taker.price, &taker.user_address) else {
                break;
            };

            let fill_qty = remaining.min(maker.remaining_quantity);
            if !book.consume(taker.side.opposite(), maker.order_id, fill_qty) {
                // Maker was concurrently consumed/removed; retry against
                // whatever now sits at the front of the book.
                continue;
            }

            trades.push(Trade {
                id: Uuid::new_v4(),
                market_id: taker.market_id,
                outcome: taker.outcome,
                price: maker.price,
                quantity: fill_qty,
                maker_order_id: maker.order_id,
                taker_order_id: taker.id,
                maker_address: maker.user_address.clone(),
                taker_address: taker.user_address.clone(),
                executed_at: now,
            });
            maker_fills.push(MakerFill {
                order_id: maker.order_id,
                original_quantity: maker.quantity,
                remaining_quantity: maker.remaining_quantity - fill_qty,
            });

            remaining -= fill_qty;
        }

        MatchResult {
            trades,
            maker_fills,
            taker_remaining: remaining,
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::Outcome;
    use crate::models::order::OrderStatus;
    use rust_decimal_macros::dec;

    fn resting(
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        user_address: &str,
        price: rust_decimal::Decimal,
        qty: i64,
    ) -> Order {
        Order {
            id: Uuid::new_v4(),
            market_id,
            user_address: user_address.to_string(),
            side,
            outcome,
            price,
            quantity: qty,
            filled_quantity: 0,
            status: OrderStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn taker_rests_fully_against_empty_book() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let taker = resting(book.market_id(), Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 10);
        let result = MatchingEngine::new().match_order(&taker, &book);
        assert_eq!(result.taker_remaining, 10);
        assert!(result.trades.is_empty());
    }

    #[test]
    fn exact_cross_fills_both_sides_completely() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let maker = resting(book.market_id(), Outcome::Yes, OrderSide::Sell, "0xmaker", dec!(0.5), 10);
        book.add(&maker).unwrap();

        let taker = resting(book.market_id(), Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 10);
        let result = MatchingEngine::new().match_order(&taker, &book);

        assert_eq!(result.taker_remaining, 0);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].price, dec!(0.5));
        assert_eq!(result.trades[0].quantity, 10);
        assert!(!book.has_order(maker.id));

        assert_eq!(result.maker_fills.len(), 1);
        assert_eq!(result.maker_fills[0].order_id, maker.id);
        assert_eq!(result.maker_fills[0].filled_quantity(), 10);
        assert_eq!(result.maker_fills[0].remaining_quantity, 0);
    }

    #[test]
    fn partial_taker_leaves_residual() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let maker = resting(book.market_id(), Outcome::Yes, OrderSide::Sell, "0xmaker", dec!(0.5), 4);
        book.add(&maker).unwrap();

        let taker = resting(book.market_id(), Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 10);
        let result = MatchingEngine::new().match_order(&taker, &book);

        assert_eq!(result.taker_remaining, 6);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].quantity, 4);
        assert_eq!(result.maker_fills[0].filled_quantity(), 4);
    }

    #[test]
    fn price_time_priority_fills_best_price_and_oldest_first() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let market_id = book.market_id();
        let best = resting(market_id, Outcome::Yes, OrderSide::Sell, "0xmaker1", dec!(0.4), 3);
        let worse = resting(market_id, Outcome::Yes, OrderSide::Sell, "0xmaker2", dec!(0.5), 3);
        book.add(&worse).unwrap();
        book.add(&best).unwrap();

        let taker = resting(market_id, Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 4);
        let result = MatchingEngine::new().match_order(&taker, &book);

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].price, dec!(0.4));
        assert_eq!(result.trades[0].quantity, 3);
        assert_eq!(result.trades[1].price, dec!(0.5));
        assert_eq!(result.trades[1].quantity, 1);
    }

    #[test]
    fn self_trade_is_skipped_in_favor_of_next_eligible_maker() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let market_id = book.market_id();
        let own = resting(market_id, Outcome::Yes, OrderSide::Sell, "0xtaker", dec!(0.5), 5);
        let other = resting(market_id, Outcome::Yes, OrderSide::Sell, "0xmaker", dec!(0.5), 5);
        book.add(&own).unwrap();
        book.add(&other).unwrap();

        let taker = resting(market_id, Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 5);
        let result = MatchingEngine::new().match_order(&taker, &book);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].maker_order_id, other.id);
        assert!(book.has_order(own.id));
    }

    #[test]
    fn non_crossing_price_leaves_taker_fully_resting() {
        let book = OrderBook::new(Uuid::new_v4(), Outcome::Yes);
        let maker = resting(book.market_id(), Outcome::Yes, OrderSide::Sell, "0xmaker", dec!(0.6), 5);
        book.add(&maker).unwrap();

        let taker = resting(book.market_id(), Outcome::Yes, OrderSide::Buy, "0xtaker", dec!(0.5), 5);
        let result = MatchingEngine::new().match_order(&taker, &book);

        assert_eq!(result.taker_remaining, 5);
        assert!(result.trades.is_empty());
    }
}
