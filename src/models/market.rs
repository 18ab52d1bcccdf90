//! Market and outcome types.
//!
//! A Market is external to the trading core (created and resolved by a
//! separate collaborator); the core only reads its liveness fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One of the two sides of a binary prediction market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outcome", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "market_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Active,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Market {
    pub id: Uuid,
    pub question: String,
    pub end_time: DateTime<Utc>,
    pub oracle_address: String,
    pub status: MarketStatus,
    pub outcome: Option<Outcome>,
    pub created_at: DateTime<Utc>,
}

/// Reasons a market fails the "tradable" check in the Validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketNotTradableReason {
    NotFound,
    Resolved,
    Cancelled,
    Ended,
}

impl Market {
    /// True while orders may be accepted: status=ACTIVE and now < end_time.
    pub fn tradable_at(&self, now: DateTime<Utc>) -> Result<(), MarketNotTradableReason> {
        match self.status {
            MarketStatus::Resolved => return Err(MarketNotTradableReason::Resolved),
            MarketStatus::Cancelled => return Err(MarketNotTradableReason::Cancelled),
            MarketStatus::Active => {}
        }
        if now >= self.end_time {
            return Err(MarketNotTradableReason::Ended);
        }
        Ok(())
    }
}
