//! Store trait for the bookkeeping structures behind each concurrency group.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::GateResult;

/// One page of a cursor-driven scan.
///
/// A returned `cursor` of `0` means the scan is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage<T> {
    /// Cursor to pass to the next call.
    pub cursor: u64,
    /// Items found in this page.
    pub items: Vec<T>,
}

impl<T> ScanPage<T> {
    /// Whether this is the last page of the scan.
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Narrow interface over a connected key-value store.
///
/// Each group is a hash keyed by holder id with the lease expiry (Unix
/// seconds, encoded as a decimal string) as the value. Every method that
/// touches a hash must fail with [`GateError::WrongType`] when the key holds
/// something else.
///
/// [`GateError::WrongType`]: crate::error::GateError::WrongType
#[async_trait]
pub trait SlotStore: Send + Sync + std::fmt::Debug + 'static {
    /// Number of fields in the hash at `key`; `0` when the key is absent.
    async fn occupancy(&self, key: &str) -> GateResult<u64>;

    /// Write `holder` with `lease_expiry`, refresh the TTL of `key` to `ttl`,
    /// and re-read the occupancy, as one contiguous unit.
    ///
    /// Returns the occupancy observed after the write.
    async fn insert_holder(
        &self,
        key: &str,
        holder: &str,
        lease_expiry: i64,
        ttl: Duration,
    ) -> GateResult<u64>;

    /// Delete the given fields. Absent fields are ignored.
    ///
    /// Returns how many fields were actually removed.
    async fn remove_holders(&self, key: &str, holders: &[String]) -> GateResult<u64>;

    /// Return one page of `(holder, value)` pairs from the hash at `key`.
    async fn scan_holders(&self, key: &str, cursor: u64) -> GateResult<ScanPage<(String, String)>>;

    /// Delete the whole key regardless of its type.
    async fn delete(&self, key: &str) -> GateResult<bool>;

    /// Return one page of key names matching a glob `pattern`.
    async fn scan_keys(&self, pattern: &str, cursor: u64) -> GateResult<ScanPage<String>>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> GateResult<bool>;
}
