//! Concurrency group configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::LimitDescriptor;

/// Configuration of one concurrency group as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Concurrency group identifier.
    pub key: String,
    /// Maximum number of concurrently running executions.
    pub limit: u32,
    /// Seconds to wait for a slot before failing.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Milliseconds between acquisition attempts.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Lease and structure TTL in seconds.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
}

impl LimitConfig {
    /// Convert into the immutable descriptor used by the limiter.
    pub fn to_descriptor(&self) -> LimitDescriptor {
        LimitDescriptor::new(self.key.clone(), self.limit)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_lease(Duration::from_secs(self.lease_seconds))
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    100
}

fn default_lease() -> u64 {
    60
}
