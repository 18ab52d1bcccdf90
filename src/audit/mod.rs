//! AuditLog: append-only per-market and global trade
//! streams with range and tailing queries.

pub mod id;
pub mod memory;
pub mod redis;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::order::OrderSide;
use crate::models::trade::Trade;

pub use types::{AuditEntry, AuditStats};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Clamps a caller-supplied limit to a sane default and ceiling
/// (`unwrap_or(default).min(max).max(1)`).
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT).max(1)
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one entry to both the market stream and the global stream.
    /// The submit path treats failure here as fatal and rolls back the
    /// whole transaction.
    async fn append(&self, trade: &Trade, taker_side: OrderSide) -> Result<AuditEntry, AuditError>;

    async fn get_for_market(&self, market_id: Uuid, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError>;

    async fn get_recent_global(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError>;

    async fn get_range(
        &self,
        market_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, AuditError>;

    async fn stats(&self, market_id: Uuid) -> Result<AuditStats, AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_applies_default_and_bounds() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(5000)), 1000);
        assert_eq!(clamp_limit(Some(42)), 42);
    }
}
