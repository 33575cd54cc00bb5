//! Store backend configuration.

use serde::{Deserialize, Serialize};

/// Which store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Shared Redis server (multi-process, multi-node).
    #[default]
    Redis,
    /// In-process store (single process only).
    Memory,
}

/// Top-level store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type: `"redis"` or `"memory"`.
    #[serde(default)]
    pub provider: StoreKind,
    /// Redis connection settings.
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis connection configuration.
///
/// Equal configurations share one connected client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (`redis://`, `rediss://` or `redis+unix://`).
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}
