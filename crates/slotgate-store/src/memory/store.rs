//! In-memory slot store guarded by a Tokio mutex.
//!
//! Mirrors the Redis semantics the limiter relies on: hashes with a per-key
//! TTL, empty hashes disappearing, `WRONGTYPE` on non-hash keys, and glob
//! key scanning. All state lives behind one lock, so every method is atomic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::{ScanPage, SlotStore};

/// Value stored under a key.
#[derive(Debug)]
enum Value {
    /// A hash of holder id to lease expiry.
    Hash(HashMap<String, String>),
    /// A plain string, as left behind by some unrelated user of the key.
    Plain(String),
}

/// A stored value and its optional expiry.
#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process slot store for single-process deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    /// All keys, guarded by one lock.
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemorySlotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a plain string under `key`, replacing whatever was there.
    pub async fn set_plain(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Plain(value.to_string()),
                expires_at: None,
            },
        );
    }

    /// Write a raw hash field without touching the key's TTL.
    pub async fn set_field(&self, key: &str, field: &str, value: &str) -> GateResult<()> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });

        match &mut entry.value {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Value::Plain(_) => Err(GateError::wrong_type(key)),
        }
    }

    /// Read a raw hash field.
    pub async fn get_field(&self, key: &str, field: &str) -> GateResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());

        match entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(Value::Plain(_)) => Err(GateError::wrong_type(key)),
        }
    }

    /// Remaining TTL of `key`, if it exists and has one.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        purge_expired(&mut entries, key, now);
        entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }
}

/// Drop `key` if its TTL has elapsed.
fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
        debug!(key, "Expired key evicted");
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn occupancy(&self, key: &str) -> GateResult<u64> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());

        match entries.get(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Hash(fields)) => Ok(fields.len() as u64),
            Some(Value::Plain(_)) => Err(GateError::wrong_type(key)),
        }
    }

    async fn insert_holder(
        &self,
        key: &str,
        holder: &str,
        lease_expiry: i64,
        ttl: Duration,
    ) -> GateResult<u64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| GateError::validation(format!("TTL for '{key}' is out of range")))?;
        purge_expired(&mut entries, key, now);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });

        let Value::Hash(fields) = &mut entry.value else {
            return Err(GateError::wrong_type(key));
        };

        fields.insert(holder.to_string(), lease_expiry.to_string());
        let count = fields.len() as u64;
        entry.expires_at = Some(expires_at);

        Ok(count)
    }

    async fn remove_holders(&self, key: &str, holders: &[String]) -> GateResult<u64> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());

        let Some(entry) = entries.get_mut(key) else {
            return Ok(0);
        };

        let Value::Hash(fields) = &mut entry.value else {
            return Err(GateError::wrong_type(key));
        };

        let removed = holders
            .iter()
            .filter(|holder| fields.remove(holder.as_str()).is_some())
            .count() as u64;

        if fields.is_empty() {
            entries.remove(key);
        }

        Ok(removed)
    }

    async fn scan_holders(&self, key: &str, _cursor: u64) -> GateResult<ScanPage<(String, String)>> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());

        let items = match entries.get(key).map(|e| &e.value) {
            None => Vec::new(),
            Some(Value::Hash(fields)) => fields
                .iter()
                .map(|(holder, value)| (holder.clone(), value.clone()))
                .collect(),
            Some(Value::Plain(_)) => return Err(GateError::wrong_type(key)),
        };

        Ok(ScanPage { cursor: 0, items })
    }

    async fn delete(&self, key: &str) -> GateResult<bool> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key, Instant::now());
        Ok(entries.remove(key).is_some())
    }

    async fn scan_keys(&self, pattern: &str, _cursor: u64) -> GateResult<ScanPage<String>> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| GateError::validation(format!("Invalid key pattern '{pattern}': {e}")))?;

        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));

        let items = entries
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect();

        Ok(ScanPage { cursor: 0, items })
    }

    async fn health_check(&self) -> GateResult<bool> {
        Ok(true)
    }
}
