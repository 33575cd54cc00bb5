//! Stale lock sweeper configuration.

use serde::{Deserialize, Serialize};

/// Settings for the periodic stale lock sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweeps.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Optional glob; matching keys are swept in addition to configured limits.
    #[serde(default)]
    pub key_pattern: Option<String>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            key_pattern: None,
        }
    }
}

fn default_interval() -> u64 {
    30
}
