//! Admission lock: per-`(user_address, market_id)`, non-blocking, TTL'd.
//! Grounded in `auth::rate_limit::RateLimiter`'s
//! `DashMap<String, RateLimitEntry>` plus a `tokio::spawn` sweep task —
//! same shape, different eviction rule (hard TTL instead of sliding
//! window).

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct AdmissionEntry {
    deadline: Instant,
}

/// In-process, same-binary lock: admission is not a cross-node resource,
/// so a `DashMap` compare-and-insert is sufficient and
/// avoids a network round trip on the submit hot path.
pub struct AdmissionLock {
    entries: DashMap<(String, uuid::Uuid), AdmissionEntry>,
    ttl: Duration,
}

pub struct AdmissionGuard<'a> {
    lock: &'a AdmissionLock,
    key: (String, uuid::Uuid),
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.lock.entries.remove(&self.key);
    }
}

impl AdmissionLock {
    pub fn new(ttl: Duration) -> Self {
        let lock = AdmissionLock {
            entries: DashMap::new(),
            ttl,
        };

        let entries = lock.entries.clone();
        let sweep_interval = ttl.max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                let now = Instant::now();
                entries.retain(|_, entry| entry.deadline > now);
            }
        });

        lock
    }

    /// Acquires the lock for `(user_address, market_id)`. Non-blocking:
    /// returns `None` immediately if a live, unexpired entry is already
    /// present, signaling the caller to treat this as rate-limited.
    pub fn try_acquire(&self, user_address: &str, market_id: uuid::Uuid) -> Option<AdmissionGuard<'_>> {
        let key = (user_address.to_string(), market_id);
        let now = Instant::now();

        match self.entries.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().deadline <= now {
                    occupied.insert(AdmissionEntry {
                        deadline: now + self.ttl,
                    });
                    Some(AdmissionGuard { lock: self, key })
                } else {
                    None
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(AdmissionEntry {
                    deadline: now + self.ttl,
                });
                Some(AdmissionGuard { lock: self, key })
            }
        }
    }
}
