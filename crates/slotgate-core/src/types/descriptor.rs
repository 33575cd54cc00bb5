//! Limit descriptor shared by every caller of a concurrency group.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::result::GateResult;

/// Immutable description of one concurrency group.
///
/// Two descriptors compare equal when every field matches, so they can be
/// used as map keys by callers that cache per-group state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitDescriptor {
    /// Key of the bookkeeping structure shared by all competing callers.
    pub key: String,
    /// Maximum number of concurrent holders.
    pub limit: u32,
    /// How long a caller waits for a slot before giving up.
    pub timeout: Duration,
    /// Pause between acquisition attempts.
    pub poll_interval: Duration,
    /// TTL of the bookkeeping structure and of each holder's lease.
    pub lease: Duration,
}

impl LimitDescriptor {
    /// Default wait time for a slot.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default pause between attempts.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Default lease and structure TTL.
    pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);
    /// Longest accepted lease (one year).
    pub const MAX_LEASE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Create a descriptor with default timing parameters.
    pub fn new(key: impl Into<String>, limit: u32) -> Self {
        Self {
            key: key.into(),
            limit,
            timeout: Self::DEFAULT_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            lease: Self::DEFAULT_LEASE,
        }
    }

    /// Set the wait time for a slot.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pause between attempts.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the lease duration.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Check that the descriptor can be used for acquisition.
    pub fn validate(&self) -> GateResult<()> {
        if self.key.is_empty() {
            return Err(GateError::validation("limit key must not be empty"));
        }
        if self.limit == 0 {
            return Err(GateError::validation(format!(
                "limit for '{}' must be at least 1",
                self.key
            )));
        }
        if self.lease_seconds() == 0 {
            return Err(GateError::validation(format!(
                "lease for '{}' must be at least one second",
                self.key
            )));
        }
        if self.lease > Self::MAX_LEASE {
            return Err(GateError::validation(format!(
                "lease for '{}' must not exceed {} seconds",
                self.key,
                Self::MAX_LEASE.as_secs()
            )));
        }
        Ok(())
    }

    /// Lease length in whole seconds, as applied to the store TTL.
    pub fn lease_seconds(&self) -> u64 {
        self.lease.as_secs()
    }

    /// Absolute lease expiry, in Unix seconds, for an entry written now.
    pub fn lease_expiry_from_now(&self) -> i64 {
        let lease = i64::try_from(self.lease_seconds()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_add(lease)
    }
}
