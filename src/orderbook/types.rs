//! Orderbook-local types: the fixed-point price representation and the
//! resting-order record kept inside a price level.
//!
//! Grounded in `services/matching/types.rs`'s `PriceLevel`/`OrderEntry`.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::OrderSide;

const SCALE: i64 = 100_000_000; // 8 fractional digits, matching the decimal(10,8) column scale

/// A price scaled to a fixed-point i64 so book keys compare and order
/// exactly, independent of `Decimal`'s variable-scale representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceLevel(i64);

impl PriceLevel {
    pub fn from_decimal(price: Decimal) -> Self {
        let scaled = (price * Decimal::from(SCALE)).trunc();
        let value = scaled.mantissa() / 10i128.pow(scaled.scale());
        PriceLevel(value as i64)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(SCALE)
    }
}

impl Ord for PriceLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PriceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A resting order as held inside a price level's arrival-ordered queue.
#[derive(Debug, Clone)]
pub struct BookEntry {
    pub order_id: Uuid,
    pub user_address: String,
    pub side: OrderSide,
    pub price: Decimal,
    /// Original order size, kept alongside `remaining_quantity` so a
    /// matched maker's filled amount (`quantity - remaining_quantity`)
    /// can be derived without a separate DB read.
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub arrived_at: DateTime<Utc>,
}

/// One aggregated row of `depth(n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLevel {
    pub price: Decimal,
    pub total_quantity: i64,
    pub order_count: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderBookError {
    #[error("order {0} already present in book")]
    DuplicateOrder(Uuid),
    #[error("order's (market,outcome) does not match this book")]
    OrderBookMismatch,
    #[error("negative quantity is not a valid book quantity")]
    NegativeQuantity,
}
