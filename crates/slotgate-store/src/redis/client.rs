//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use slotgate_core::config::store::RedisConfig;
use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;

/// Redis client wrapper around a reconnecting connection manager.
///
/// Cloning is cheap; all clones share the same multiplexed connection.
#[derive(Debug, Clone)]
pub struct RedisClient {
    /// Redis connection manager (multiplexed, reconnecting).
    conn: ConnectionManager,
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &RedisConfig) -> GateResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis");

        let client = Client::open(config.url.as_str())
            .map_err(|e| GateError::store_with_source("Failed to create Redis client", e))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| GateError::store_with_source("Failed to connect to Redis", e))?;

        info!("Successfully connected to Redis");
        Ok(Self { conn })
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Mask password in Redis URL for safe logging.
pub(crate) fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
