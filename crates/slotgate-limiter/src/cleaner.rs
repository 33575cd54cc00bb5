//! Eviction of holder entries whose lease has run out.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::SlotStore;
use slotgate_core::types::LimitDescriptor;

/// Scans a group's bookkeeping hash and removes expired holders.
///
/// Runs out of band from acquisitions and does not enforce the limit itself.
/// The returned count is best effort: holders may come and go during a scan.
#[derive(Debug, Clone)]
pub struct StaleLockCleaner {
    /// Store holding the bookkeeping hashes.
    store: Arc<dyn SlotStore>,
}

impl StaleLockCleaner {
    /// Create a cleaner over a connected store.
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Remove every entry of `descriptor`'s group whose lease has expired or
    /// whose value is not a timestamp.
    ///
    /// If the key holds something other than a hash it is deleted outright
    /// and `1` is returned to signal the reset.
    pub async fn clean_stale(&self, descriptor: &LimitDescriptor) -> GateResult<u64> {
        let key = descriptor.key.as_str();

        match self.sweep(key).await {
            Err(e) if e.is_wrong_type() => {
                self.store.delete(key).await?;
                info!(key, "Reset key holding a non-hash value");
                Ok(1)
            }
            result => result,
        }
    }

    async fn sweep(&self, key: &str) -> Result<u64, GateError> {
        let now = Utc::now().timestamp();
        let mut cursor = 0;
        let mut cleaned = 0;

        loop {
            let page = self.store.scan_holders(key, cursor).await?;

            let stale: Vec<String> = page
                .items
                .iter()
                .filter(|(_, value)| is_stale(value, now))
                .map(|(holder, _)| holder.clone())
                .collect();

            if !stale.is_empty() {
                cleaned += self.store.remove_holders(key, &stale).await?;
            }

            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }

        if cleaned > 0 {
            info!(key, cleaned, "Removed stale holders");
        } else {
            debug!(key, "No stale holders");
        }

        Ok(cleaned)
    }
}

/// Whether a lease value is expired at `now` (Unix seconds).
///
/// Values that do not parse as an integer are treated as expired.
fn is_stale(value: &str, now: i64) -> bool {
    match value.trim().parse::<i64>() {
        Ok(expiry) => expiry <= now,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale() {
        assert!(is_stale("99", 100));
        assert!(is_stale("100", 100));
        assert!(!is_stale("101", 100));
        assert!(!is_stale(" 101 ", 100));
        assert!(is_stale("not-a-number", 100));
        assert!(is_stale("", 100));
        assert!(is_stale("1.5e9", 100));
    }
}
