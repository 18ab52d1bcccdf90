//! PositionCalculator: derives position deltas from a
//! batch of trades produced by one taker submission.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::models::market::Outcome;
use crate::models::order::OrderSide;
use crate::models::position::{Position, PositionDelta};
use crate::models::trade::Trade;

/// Trade notional = price × quantity, rounded half-to-even to the unit
/// of the locked-collateral scale (8 fractional digits).
fn notional(price: Decimal, quantity: i64) -> Decimal {
    (price * Decimal::from(quantity)).round_dp_with_strategy(8, RoundingStrategy::MidpointNearestEven)
}

pub struct PositionCalculator;

impl PositionCalculator {
    pub fn new() -> Self {
        PositionCalculator
    }

    /// `taker_side` tells the calculator which side of each trade is the
    /// taker; the other side is the maker, with the opposite economic
    /// effect. `current` supplies the pre-trade position for every
    /// (user, outcome) the trades touch, keyed the same way the
    /// PersistenceGateway would look them up, so the volume-weighted
    /// average price can be computed against the right starting point.
    pub fn compute_deltas(
        &self,
        market_id: Uuid,
        taker_side: OrderSide,
        taker_address: &str,
        trades: &[Trade],
        current: &HashMap<(String, Outcome), Position>,
    ) -> Vec<PositionDelta> {
        let mut running: HashMap<(String, Outcome), (i64, Decimal)> = HashMap::new();
        for ((addr, outcome), pos) in current {
            running.insert((addr.clone(), *outcome), (pos.shares(*outcome), pos.avg_price(*outcome)));
        }

        let mut deltas: Vec<PositionDelta> = Vec::new();
        let mut order: Vec<(String, Outcome)> = Vec::new();

        for trade in trades {
            let outcome = trade.outcome;
            for (address, side) in [
                (taker_address.to_string(), taker_side),
                (other_party(trade, taker_address), taker_side.opposite()),
            ] {
                let key = (address.clone(), outcome);
                let (shares, avg_price) = running
                    .entry(key.clone())
                    .or_insert((0, Decimal::ZERO));

                let trade_notional = notional(trade.price, trade.quantity);
                let (new_shares, new_avg, collateral_delta) = match side {
                    OrderSide::Buy => {
                        let new_shares = *shares + trade.quantity;
                        let new_avg = if new_shares == 0 {
                            Decimal::ZERO
                        } else {
                            (*avg_price * Decimal::from(*shares) + trade.price * Decimal::from(trade.quantity))
                                / Decimal::from(new_shares)
                        };
                        (new_shares, Some(new_avg), trade_notional)
                    }
                    OrderSide::Sell => {
                        let new_shares = *shares - trade.quantity;
                        let new_avg = if new_shares == 0 { Some(Decimal::ZERO) } else { None };
                        (new_shares, new_avg, -trade_notional)
                    }
                };

                if !order.contains(&key) {
                    order.push(key.clone());
                }
                *shares = new_shares;
                if let Some(avg) = new_avg {
                    *avg_price = avg;
                }

                deltas.push(PositionDelta {
                    market_id,
                    user_address: address,
                    outcome,
                    share_delta: if side == OrderSide::Buy { trade.quantity } else { -trade.quantity },
                    collateral_delta,
                    new_avg_price: new_avg,
                });
            }
        }

        merge_by_key(deltas)
    }
}

impl Default for PositionCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn other_party(trade: &Trade, taker_address: &str) -> String {
    if trade.taker_address == taker_address {
        trade.maker_address.clone()
    } else {
        trade.taker_address.clone()
    }
}

/// Collapses multiple deltas for the same (user, outcome) into one,
/// summing share/collateral deltas and keeping the last `new_avg_price`.
/// Deltas are grouped and applied once per (user, market, outcome).
fn merge_by_key(deltas: Vec<PositionDelta>) -> Vec<PositionDelta> {
    let mut merged: Vec<PositionDelta> = Vec::new();
    for delta in deltas {
        if let Some(existing) = merged
            .iter_mut()
            .find(|d| d.user_address == delta.user_address && d.outcome == delta.outcome)
        {
            existing.share_delta += delta.share_delta;
            existing.collateral_delta += delta.collateral_delta;
            if delta.new_avg_price.is_some() {
                existing.new_avg_price = delta.new_avg_price;
            }
        } else {
            merged.push(delta);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn trade(market_id: Uuid, maker: &str, taker: &str, price: Decimal, qty: i64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            market_id,
            outcome: Outcome::Yes,
            price,
            quantity: qty,
            maker_order_id: Uuid::new_v4(),
            taker_order_id: Uuid::new_v4(),
            maker_address: maker.to_string(),
            taker_address: taker.to_string(),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn notional_rounds_half_to_even_at_eight_fractional_digits() {
        assert_eq!(notional(dec!(0.123456785), 1), dec!(0.12345678));
        assert_eq!(notional(dec!(0.123456775), 1), dec!(0.12345678));
    }

    #[test]
    fn buyer_gains_shares_and_locks_collateral() {
        let market_id = Uuid::new_v4();
        let trades = vec![trade(market_id, "0xmaker", "0xtaker", dec!(0.5), 10)];
        let deltas = PositionCalculator::new().compute_deltas(
            market_id,
            OrderSide::Buy,
            "0xtaker",
            &trades,
            &HashMap::new(),
        );

        let buyer = deltas.iter().find(|d| d.user_address == "0xtaker").unwrap();
        assert_eq!(buyer.share_delta, 10);
        assert_eq!(buyer.collateral_delta, dec!(5.0));
        assert_eq!(buyer.new_avg_price, Some(dec!(0.5)));
    }

    #[test]
    fn seller_loses_shares_and_releases_collateral() {
        let market_id = Uuid::new_v4();
        let trades = vec![trade(market_id, "0xmaker", "0xtaker", dec!(0.5), 10)];
        let deltas = PositionCalculator::new().compute_deltas(
            market_id,
            OrderSide::Buy,
            "0xtaker",
            &trades,
            &HashMap::new(),
        );

        let seller = deltas.iter().find(|d| d.user_address == "0xmaker").unwrap();
        assert_eq!(seller.share_delta, -10);
        assert_eq!(seller.collateral_delta, dec!(-5.0));
    }

    #[test]
    fn volume_weighted_average_price_blends_existing_and_new() {
        let market_id = Uuid::new_v4();
        let mut current = HashMap::new();
        let mut existing = Position::empty(market_id, "0xtaker".to_string());
        existing.yes_shares = 10;
        existing.yes_avg_price = dec!(0.4);
        current.insert(("0xtaker".to_string(), Outcome::Yes), existing);

        let trades = vec![trade(market_id, "0xmaker", "0xtaker", dec!(0.6), 10)];
        let deltas = PositionCalculator::new().compute_deltas(
            market_id,
            OrderSide::Buy,
            "0xtaker",
            &trades,
            &current,
        );

        let buyer = deltas.iter().find(|d| d.user_address == "0xtaker").unwrap();
        // (10*0.4 + 10*0.6) / 20 = 0.5
        assert_eq!(buyer.new_avg_price, Some(dec!(0.5)));
    }

    #[test]
    fn seller_closing_entire_position_resets_average_price_to_zero() {
        let market_id = Uuid::new_v4();
        let mut current = HashMap::new();
        let mut existing = Position::empty(market_id, "0xmaker".to_string());
        existing.yes_shares = 10;
        existing.yes_avg_price = dec!(0.4);
        current.insert(("0xmaker".to_string(), Outcome::Yes), existing);

        let trades = vec![trade(market_id, "0xmaker", "0xtaker", dec!(0.6), 10)];
        let deltas = PositionCalculator::new().compute_deltas(
            market_id,
            OrderSide::Buy,
            "0xtaker",
            &trades,
            &current,
        );

        let seller = deltas.iter().find(|d| d.user_address == "0xmaker").unwrap();
        assert_eq!(seller.new_avg_price, Some(Decimal::ZERO));
    }

    #[test]
    fn multiple_trades_for_same_counterparty_merge_into_one_delta() {
        let market_id = Uuid::new_v4();
        let trades = vec![
            trade(market_id, "0xmaker", "0xtaker", dec!(0.5), 4),
            trade(market_id, "0xmaker", "0xtaker", dec!(0.5), 6),
        ];
        let deltas = PositionCalculator::new().compute_deltas(
            market_id,
            OrderSide::Buy,
            "0xtaker",
            &trades,
            &HashMap::new(),
        );

        assert_eq!(deltas.iter().filter(|d| d.user_address == "0xtaker").count(), 1);
        let buyer = deltas.iter().find(|d| d.user_address == "0xtaker").unwrap();
        assert_eq!(buyer.share_delta, 10);
    }
}
