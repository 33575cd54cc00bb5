//! Process-wide registry of Redis clients keyed by configuration.

use std::collections::HashMap;
use std::sync::OnceLock;

use tokio::sync::Mutex;
use tracing::debug;

use slotgate_core::config::store::RedisConfig;
use slotgate_core::result::GateResult;

use super::client::RedisClient;

/// Lazily populated map from a Redis configuration to its connected client.
///
/// A client is created once per distinct configuration and handed out as a
/// cheap clone afterwards.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Connected clients by configuration.
    clients: Mutex<HashMap<RedisConfig, RedisClient>>,
}

impl ClientRegistry {
    /// The registry shared by the whole process.
    pub fn global() -> &'static ClientRegistry {
        static REGISTRY: OnceLock<ClientRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ClientRegistry::default)
    }

    /// Return the client for `config`, connecting on first use.
    ///
    /// The lock is held across the connect so concurrent first callers for
    /// the same configuration share one client.
    pub async fn get(&self, config: &RedisConfig) -> GateResult<RedisClient> {
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients.get(config) {
            return Ok(client.clone());
        }

        let client = RedisClient::connect(config).await?;
        clients.insert(config.clone(), client.clone());
        debug!(clients = clients.len(), "Registered Redis client");

        Ok(client)
    }

    /// Number of distinct configurations with a connected client.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Whether no client has been created yet.
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}
