//! Position entity and the deltas the
//! PositionCalculator derives from a batch of trades.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::market::Outcome;

/// One row per (market, user). `yes_avg_price`/`no_avg_price` are required
/// to maintain the volume-weighted average price rule and so are carried
/// alongside the share counts they describe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub market_id: Uuid,
    pub user_address: String,
    pub yes_shares: i64,
    pub yes_avg_price: Decimal,
    pub no_shares: i64,
    pub no_avg_price: Decimal,
    pub locked_collateral: Decimal,
    pub is_settled: bool,
}

impl Position {
    pub fn empty(market_id: Uuid, user_address: String) -> Self {
        Position {
            market_id,
            user_address,
            yes_shares: 0,
            yes_avg_price: Decimal::ZERO,
            no_shares: 0,
            no_avg_price: Decimal::ZERO,
            locked_collateral: Decimal::ZERO,
            is_settled: false,
        }
    }

    pub fn shares(&self, outcome: Outcome) -> i64 {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    pub fn avg_price(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.yes_avg_price,
            Outcome::No => self.no_avg_price,
        }
    }
}

/// A per-(user, market, outcome) change to apply atomically alongside the
/// trades that produced it. Deltas are grouped and applied
/// once per (user, market, outcome).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionDelta {
    pub market_id: Uuid,
    pub user_address: String,
    pub outcome: Outcome,
    pub share_delta: i64,
    pub collateral_delta: Decimal,
    /// `None` means "leave the outcome's average price as-is" (the SELL
    /// case where resulting shares are still > 0).
    pub new_avg_price: Option<Decimal>,
}
