//! Trade entity — one match between a resting maker
//! order and an incoming taker order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::market::Outcome;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub market_id: Uuid,
    pub outcome: Outcome,
    /// Execution price — always the resting maker order's price.
    pub price: Decimal,
    pub quantity: i64,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_address: String,
    pub taker_address: String,
    pub executed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trade_carries_maker_price() {
        let t = Trade {
            id: Uuid::new_v4(),
            market_id: Uuid::new_v4(),
            outcome: Outcome::Yes,
            price: dec!(0.42),
            quantity: 5,
            maker_order_id: Uuid::new_v4(),
            taker_order_id: Uuid::new_v4(),
            maker_address: "0x1".into(),
            taker_address: "0x2".into(),
            executed_at: Utc::now(),
        };
        assert_eq!(t.price, dec!(0.42));
        assert_eq!(t.quantity, 5);
    }
}
