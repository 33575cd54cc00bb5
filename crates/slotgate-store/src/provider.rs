//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use slotgate_core::config::store::{StoreConfig, StoreKind};
use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::{ScanPage, SlotStore};

/// Store manager that wraps the configured backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store.
    inner: Arc<dyn SlotStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> GateResult<Self> {
        let inner: Arc<dyn SlotStore> = match config.provider {
            #[cfg(feature = "redis-backend")]
            StoreKind::Redis => {
                info!("Initializing Redis slot store");
                Arc::new(crate::redis::RedisSlotStore::from_config(&config.redis).await?)
            }
            #[cfg(feature = "memory")]
            StoreKind::Memory => {
                info!("Initializing in-memory slot store");
                Arc::new(crate::memory::MemorySlotStore::new())
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(GateError::configuration(format!(
                    "Store provider '{other:?}' is not compiled into this build"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn SlotStore>) -> Self {
        Self { inner: store }
    }

    /// Get a shared handle to the inner store.
    pub fn store(&self) -> Arc<dyn SlotStore> {
        self.inner.clone()
    }
}

#[async_trait]
impl SlotStore for StoreManager {
    async fn occupancy(&self, key: &str) -> GateResult<u64> {
        self.inner.occupancy(key).await
    }

    async fn insert_holder(
        &self,
        key: &str,
        holder: &str,
        lease_expiry: i64,
        ttl: Duration,
    ) -> GateResult<u64> {
        self.inner
            .insert_holder(key, holder, lease_expiry, ttl)
            .await
    }

    async fn remove_holders(&self, key: &str, holders: &[String]) -> GateResult<u64> {
        self.inner.remove_holders(key, holders).await
    }

    async fn scan_holders(&self, key: &str, cursor: u64) -> GateResult<ScanPage<(String, String)>> {
        self.inner.scan_holders(key, cursor).await
    }

    async fn delete(&self, key: &str) -> GateResult<bool> {
        self.inner.delete(key).await
    }

    async fn scan_keys(&self, pattern: &str, cursor: u64) -> GateResult<ScanPage<String>> {
        self.inner.scan_keys(pattern, cursor).await
    }

    async fn health_check(&self) -> GateResult<bool> {
        self.inner.health_check().await
    }
}
