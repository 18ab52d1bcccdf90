//! Matching lock: one `tokio::sync::Mutex` per `(market_id, outcome)`,
//! held for the duration of MatchingEngine execution and book mutation.
//! Registered alongside the OrderBook
//! registry as process-wide global state.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::market::Outcome;

#[derive(Default)]
pub struct MatchingLockRegistry {
    locks: DashMap<(Uuid, Outcome), Arc<Mutex<()>>>,
}

impl MatchingLockRegistry {
    pub fn new() -> Self {
        MatchingLockRegistry {
            locks: DashMap::new(),
        }
    }

    /// Acquires the lock for `(market_id, outcome)`, creating it on first
    /// access. Held for the whole matching + book-mutation critical
    /// section by the caller.
    pub async fn acquire(&self, market_id: Uuid, outcome: Outcome) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry((market_id, outcome))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
