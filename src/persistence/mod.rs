//! PersistenceGateway: executes the order/trade/position
//! write sequence transactionally with serializable isolation, retrying
//! on conflict.
//!
//! An arbitrary-closure `run_transaction` would be more general, but
//! this system only ever builds one shape of transaction body (upsert the
//! taker order and touched maker orders, insert the resulting trades,
//! apply position deltas), so the trait takes that write batch as a typed
//! argument rather than a boxed closure — avoiding a generic-closure/
//! boxed-future abstraction with exactly one call site. Position deltas
//! are computed inside the transaction (after loading the pre-trade
//! positions) via `PositionCalculator`, so the retry-on-conflict loop
//! covers the read-then-write race on position rows too.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::order::{Order, OrderSide, OrderStatus};
use crate::models::position::PositionDelta;
use crate::models::trade::Trade;

#[derive(Debug, Clone)]
pub struct MakerUpdate {
    pub order_id: Uuid,
    pub filled_quantity: i64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct SubmitTransactionInput {
    pub taker_order: Order,
    pub maker_updates: Vec<MakerUpdate>,
    pub trades: Vec<Trade>,
    pub taker_side: OrderSide,
}

#[derive(Debug, Clone)]
pub struct SubmitTransactionOutput {
    pub position_deltas: Vec<PositionDelta>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("transaction retries exhausted due to repeated serialization conflicts")]
    SerializationConflict,
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Runs the order-submit write sequence with Serializable isolation,
    /// retrying automatically on a serialization conflict
    /// with exponential backoff (50ms base, 2s cap, 3 attempts by
    /// default). Other errors propagate without retry.
    async fn run_submit_transaction(
        &self,
        input: SubmitTransactionInput,
    ) -> Result<SubmitTransactionOutput, PersistenceError>;

    async fn get_market(
        &self,
        market_id: Uuid,
    ) -> Result<Option<crate::models::market::Market>, PersistenceError>;
}

/// Shared retry policy for `run_submit_transaction` implementations:
/// base 50ms, cap 2s, max 3 attempts.
pub struct RetryPolicy {
    pub base: std::time::Duration,
    pub cap: std::time::Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base: std::time::Duration::from_millis(50),
            cap: std::time::Duration::from_secs(2),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let millis = self.base.as_millis().saturating_mul(1u128 << attempt.min(31));
        std::time::Duration::from_millis(millis.min(self.cap.as_millis()) as u64)
    }
}
