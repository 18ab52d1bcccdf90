//! In-memory `AuditLog` fake for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::order::OrderSide;
use crate::models::trade::Trade;

use super::id::IdGenerator;
use super::{clamp_limit, AuditEntry, AuditError, AuditLog, AuditStats};

fn market_stream(market_id: Uuid) -> String {
    format!("audit:market:{market_id}")
}

const GLOBAL_STREAM: &str = "audit:global";

#[derive(Default)]
pub struct InMemoryAuditLog {
    streams: Mutex<BTreeMap<String, BTreeMap<String, AuditEntry>>>,
    ids: IdGenerator,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        InMemoryAuditLog::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, trade: &Trade, taker_side: OrderSide) -> Result<AuditEntry, AuditError> {
        let now = Utc::now();
        let now_millis = now.timestamp_millis();
        let market_key = market_stream(trade.market_id);

        let market_id = self.ids.next(&market_key, now_millis);
        let global_id = self.ids.next(GLOBAL_STREAM, now_millis);

        let market_entry = AuditEntry::from_trade(market_id, trade, taker_side, now);
        let global_entry = AuditEntry::from_trade(global_id, trade, taker_side, now);

        let mut streams = self.streams.lock().unwrap();
        streams
            .entry(market_key)
            .or_default()
            .insert(market_entry.id.clone(), market_entry.clone());
        streams
            .entry(GLOBAL_STREAM.to_string())
            .or_default()
            .insert(global_entry.id.clone(), global_entry);

        Ok(market_entry)
    }

    async fn get_for_market(&self, market_id: Uuid, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError> {
        let limit = clamp_limit(limit);
        let streams = self.streams.lock().unwrap();
        Ok(streams
            .get(&market_stream(market_id))
            .map(|stream| stream.values().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_recent_global(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError> {
        let limit = clamp_limit(limit);
        let streams = self.streams.lock().unwrap();
        Ok(streams
            .get(GLOBAL_STREAM)
            .map(|stream| stream.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_range(
        &self,
        market_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let streams = self.streams.lock().unwrap();
        Ok(streams
            .get(&market_stream(market_id))
            .map(|stream| {
                stream
                    .values()
                    .filter(|e| e.timestamp >= start && e.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn stats(&self, market_id: Uuid) -> Result<AuditStats, AuditError> {
        let streams = self.streams.lock().unwrap();
        let Some(stream) = streams.get(&market_stream(market_id)) else {
            return Ok(AuditStats {
                count: 0,
                oldest_id: None,
                newest_id: None,
            });
        };
        Ok(AuditStats {
            count: stream.len() as u64,
            oldest_id: stream.keys().next().cloned(),
            newest_id: stream.keys().next_back().cloned(),
        })
    }
}
