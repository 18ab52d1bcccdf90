//! Redis-backed `AuditLog`. Grounded in `cache/redis_client.rs`'s
//! `ConnectionManager` + `with_retry` wrapper: entries are written as a
//! sorted-set member (score = the numeric millis prefix of the id, for
//! `ZRANGEBYSCORE` range queries) plus a hash field holding the
//! JSON-encoded payload, approximating an append-only stream with the
//! primitives `redis` 0.24 actually exposes through `ConnectionManager`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

use crate::models::order::OrderSide;
use crate::models::trade::Trade;

use super::id::IdGenerator;
use super::{clamp_limit, AuditEntry, AuditError, AuditLog, AuditStats};

fn market_stream(market_id: Uuid) -> String {
    format!("audit:market:{market_id}")
}

const GLOBAL_STREAM: &str = "audit:global";

fn score_of(id: &str) -> f64 {
    id.split('-').next().and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

pub struct RedisAuditLog {
    client: Client,
    connection: tokio::sync::RwLock<Option<ConnectionManager>>,
    ids: IdGenerator,
    max_entries_per_market: u64,
    max_entries_global: u64,
}

impl RedisAuditLog {
    pub fn new(url: &str, max_entries_per_market: u64, max_entries_global: u64) -> Result<Self, AuditError> {
        let client = redis::Client::open(url).map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(RedisAuditLog {
            client,
            connection: tokio::sync::RwLock::new(None),
            ids: IdGenerator::new(),
            max_entries_per_market,
            max_entries_global,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, AuditError> {
        if let Some(conn) = self.connection.read().await.clone() {
            return Ok(conn);
        }
        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.clone() {
            return Ok(conn);
        }
        let manager = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        *slot = Some(manager.clone());
        Ok(manager)
    }

    async fn write_stream(
        &self,
        stream: &str,
        entry: &AuditEntry,
        max_entries: u64,
    ) -> Result<(), AuditError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(entry).map_err(|e| AuditError::Unavailable(e.to_string()))?;

        let zkey = format!("{stream}:ids");
        let hkey = format!("{stream}:entries");

        let () = conn
            .zadd(&zkey, &entry.id, score_of(&entry.id))
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        let () = conn
            .hset(&hkey, &entry.id, payload)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;

        let count: u64 = conn.zcard(&zkey).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
        if count > max_entries {
            let excess = count - max_entries;
            let stale: Vec<String> = conn
                .zrange(&zkey, 0, excess as isize - 1)
                .await
                .map_err(|e| AuditError::Unavailable(e.to_string()))?;
            if !stale.is_empty() {
                let _: () = conn.zrem(&zkey, &stale).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
                let _: () = conn.hdel(&hkey, &stale).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
            }
        }

        Ok(())
    }

    async fn read_ids(&self, stream: &str, ids: Vec<String>) -> Result<Vec<AuditEntry>, AuditError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let hkey = format!("{stream}:entries");
        let payloads: Vec<Option<String>> = conn
            .hget(&hkey, &ids)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(payloads
            .into_iter()
            .flatten()
            .filter_map(|p| serde_json::from_str(&p).ok())
            .collect())
    }
}

#[async_trait]
impl AuditLog for RedisAuditLog {
    async fn append(&self, trade: &Trade, taker_side: OrderSide) -> Result<AuditEntry, AuditError> {
        let now = Utc::now();
        let now_millis = now.timestamp_millis();

        let market_key = market_stream(trade.market_id);
        let market_id = self.ids.next(&market_key, now_millis);
        let market_entry = AuditEntry::from_trade(market_id, trade, taker_side, now);
        self.write_stream(&market_key, &market_entry, self.max_entries_per_market).await?;

        let global_id = self.ids.next(GLOBAL_STREAM, now_millis);
        let global_entry = AuditEntry::from_trade(global_id, trade, taker_side, now);
        self.write_stream(GLOBAL_STREAM, &global_entry, self.max_entries_global).await?;

        Ok(market_entry)
    }

    async fn get_for_market(&self, market_id: Uuid, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError> {
        let limit = clamp_limit(limit);
        let stream = market_stream(market_id);
        let zkey = format!("{stream}:ids");
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrange(&zkey, 0, limit as isize - 1)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        self.read_ids(&stream, ids).await
    }

    async fn get_recent_global(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, AuditError> {
        let limit = clamp_limit(limit);
        let zkey = format!("{GLOBAL_STREAM}:ids");
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrevrange(&zkey, 0, limit as isize - 1)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        self.read_ids(GLOBAL_STREAM, ids).await
    }

    async fn get_range(
        &self,
        market_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let stream = market_stream(market_id);
        let zkey = format!("{stream}:ids");
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrangebyscore(&zkey, start.timestamp_millis() as f64, end.timestamp_millis() as f64)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        self.read_ids(&stream, ids).await
    }

    async fn stats(&self, market_id: Uuid) -> Result<AuditStats, AuditError> {
        let stream = market_stream(market_id);
        let zkey = format!("{stream}:ids");
        let mut conn = self.connection().await?;
        let count: u64 = conn.zcard(&zkey).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
        let oldest: Vec<String> = conn.zrange(&zkey, 0, 0).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
        let newest: Vec<String> = conn.zrevrange(&zkey, 0, 0).await.map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(AuditStats {
            count,
            oldest_id: oldest.into_iter().next(),
            newest_id: newest.into_iter().next(),
        })
    }
}
