//! Audit entry shape.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::market::Outcome;
use crate::models::order::OrderSide;
use crate::models::trade::Trade;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub trade_id: Uuid,
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub buyer_address: String,
    pub seller_address: String,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
    pub logged_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds the buyer/seller-oriented entry from a trade plus which
    /// side the taker occupied in it; `Trade` itself only records
    /// maker/taker, not buyer/seller.
    pub fn from_trade(id: String, trade: &Trade, taker_side: OrderSide, logged_at: DateTime<Utc>) -> Self {
        let (buyer_address, seller_address, buy_order_id, sell_order_id) = match taker_side {
            OrderSide::Buy => (
                trade.taker_address.clone(),
                trade.maker_address.clone(),
                trade.taker_order_id,
                trade.maker_order_id,
            ),
            OrderSide::Sell => (
                trade.maker_address.clone(),
                trade.taker_address.clone(),
                trade.maker_order_id,
                trade.taker_order_id,
            ),
        };

        AuditEntry {
            id,
            trade_id: trade.id,
            market_id: trade.market_id,
            outcome: trade.outcome,
            buyer_address,
            seller_address,
            buy_order_id,
            sell_order_id,
            price: trade.price,
            quantity: trade.quantity,
            timestamp: trade.executed_at,
            logged_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditStats {
    pub count: u64,
    pub oldest_id: Option<String>,
    pub newest_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade {
            id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            outcome: Outcome::Yes,
            price: dec!(0.5),
            quantity: 5,
            maker_order_id: Uuid::new_v4(),
            taker_order_id: Uuid::new_v4(),
            maker_address: "0xmaker".to_string(),
            taker_address: "0xtaker".to_string(),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn buy_taker_is_the_buyer() {
        let t = trade();
        let entry = AuditEntry::from_trade("1-0".to_string(), &t, OrderSide::Buy, Utc::now());
        assert_eq!(entry.buyer_address, "0xtaker");
        assert_eq!(entry.seller_address, "0xmaker");
    }

    #[test]
    fn sell_taker_is_the_seller() {
        let t = trade();
        let entry = AuditEntry::from_trade("1-0".to_string(), &t, OrderSide::Sell, Utc::now());
        assert_eq!(entry.buyer_address, "0xmaker");
        assert_eq!(entry.seller_address, "0xtaker");
    }
}
