//! Receipt — the signed response to a successful order submission,
//! returned as the `POST /orders` 201 body.
//!
//! `canonical_payload` is hand-written rather than derived from `Serialize`:
//! struct field order is not part of Rust's API contract, so the bytes the
//! ReceiptSigner hashes are built explicitly in a fixed field order instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::market::Outcome;
use super::order::{OrderSide, OrderStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub trade_id: Uuid,
    pub price: Decimal,
    pub quantity: i64,
    pub counterparty_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order_id: Uuid,
    pub market_id: Uuid,
    pub side: OrderSide,
    pub outcome: Outcome,
    pub price: Decimal,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub status: OrderStatus,
    pub trades: Vec<TradeReceipt>,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

impl Receipt {
    /// Deterministic byte representation for signing: fixed field order,
    /// integers as decimal strings, prices at fixed 8-digit scale,
    /// timestamps as RFC 3339. Excludes `signature` itself.
    pub fn canonical_payload(&self) -> String {
        let mut buf = String::new();
        buf.push_str(&self.order_id.to_string());
        buf.push('|');
        buf.push_str(&self.market_id.to_string());
        buf.push('|');
        buf.push_str(&self.side.to_string());
        buf.push('|');
        buf.push_str(&self.outcome.to_string());
        buf.push('|');
        buf.push_str(&self.price.round_dp(8).to_string());
        buf.push('|');
        buf.push_str(&self.quantity.to_string());
        buf.push('|');
        buf.push_str(&self.filled_quantity.to_string());
        buf.push('|');
        buf.push_str(&self.status.to_string());
        buf.push('|');
        for trade in &self.trades {
            buf.push_str(&trade.trade_id.to_string());
            buf.push(':');
            buf.push_str(&trade.price.round_dp(8).to_string());
            buf.push(':');
            buf.push_str(&trade.quantity.to_string());
            buf.push(':');
            buf.push_str(&trade.counterparty_address);
            buf.push(';');
        }
        buf.push('|');
        buf.push_str(&self.timestamp.to_rfc3339());
        buf
    }
}
