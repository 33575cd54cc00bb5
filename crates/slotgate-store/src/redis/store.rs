//! Redis-backed slot store.
//!
//! Each group is a Redis hash. The insertion batch runs as a `MULTI/EXEC`
//! transaction so no other client's command lands between the `HSET` and
//! the `HLEN` that follows it.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use slotgate_core::config::store::RedisConfig;
use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::{ScanPage, SlotStore};

use super::client::RedisClient;
use super::registry::ClientRegistry;

/// `COUNT` hint passed to `SCAN` and `HSCAN`.
const SCAN_COUNT: u64 = 100;

/// Redis-backed slot store.
#[derive(Debug, Clone)]
pub struct RedisSlotStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisSlotStore {
    /// Create a store over an already connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Create a store using the process-wide client for `config`.
    pub async fn from_config(config: &RedisConfig) -> GateResult<Self> {
        let client = ClientRegistry::global().get(config).await?;
        Ok(Self::new(client))
    }

    /// Map a Redis error to a `GateError`, recognising `WRONGTYPE` replies.
    fn map_err(key: &str, e: redis::RedisError) -> GateError {
        if e.code() == Some("WRONGTYPE") {
            GateError::wrong_type(key)
        } else {
            GateError::store_with_source(format!("Redis error: {e}"), e)
        }
    }
}

#[async_trait]
impl SlotStore for RedisSlotStore {
    async fn occupancy(&self, key: &str) -> GateResult<u64> {
        let mut conn = self.client.conn_mut();
        let count: u64 = conn.hlen(key).await.map_err(|e| Self::map_err(key, e))?;
        Ok(count)
    }

    async fn insert_holder(
        &self,
        key: &str,
        holder: &str,
        lease_expiry: i64,
        ttl: Duration,
    ) -> GateResult<u64> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| GateError::validation(format!("TTL for '{key}' is out of range")))?;

        let mut conn = self.client.conn_mut();

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .hset(key, holder, lease_expiry)
            .ignore()
            .expire(key, ttl_secs)
            .ignore()
            .hlen(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err(key, e))?;

        Ok(count)
    }

    async fn remove_holders(&self, key: &str, holders: &[String]) -> GateResult<u64> {
        if holders.is_empty() {
            return Ok(0);
        }

        let mut conn = self.client.conn_mut();
        let removed: u64 = conn
            .hdel(key, holders)
            .await
            .map_err(|e| Self::map_err(key, e))?;
        Ok(removed)
    }

    async fn scan_holders(&self, key: &str, cursor: u64) -> GateResult<ScanPage<(String, String)>> {
        let mut conn = self.client.conn_mut();

        // Values are read as raw bytes so a foreign, non-UTF-8 value still
        // reaches the caller (and is treated as corrupted) instead of failing
        // the whole page.
        let (next, flat): (u64, Vec<Vec<u8>>) = redis::cmd("HSCAN")
            .arg(key)
            .cursor_arg(cursor)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err(key, e))?;

        let items = flat
            .chunks_exact(2)
            .map(|pair| {
                (
                    String::from_utf8_lossy(&pair[0]).into_owned(),
                    String::from_utf8_lossy(&pair[1]).into_owned(),
                )
            })
            .collect();

        Ok(ScanPage {
            cursor: next,
            items,
        })
    }

    async fn delete(&self, key: &str) -> GateResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: u64 = conn.del(key).await.map_err(|e| Self::map_err(key, e))?;
        debug!(key, removed, "Deleted key");
        Ok(removed > 0)
    }

    async fn scan_keys(&self, pattern: &str, cursor: u64) -> GateResult<ScanPage<String>> {
        let mut conn = self.client.conn_mut();

        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .cursor_arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err(pattern, e))?;

        Ok(ScanPage {
            cursor: next,
            items: keys,
        })
    }

    async fn health_check(&self) -> GateResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| GateError::store_with_source(format!("Redis error: {e}"), e))?;
        Ok(pong == "PONG")
    }
}
