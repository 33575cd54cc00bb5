//! Facade bundling the limiter and the maintenance operations over one store.

use std::future::Future;
use std::sync::Arc;

use futures::Stream;

use slotgate_core::config::store::StoreConfig;
use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::SlotStore;
use slotgate_core::types::LimitDescriptor;
use slotgate_store::StoreManager;

use crate::cleaner::StaleLockCleaner;
use crate::keys::KeyEnumerator;
use crate::limiter::{Admission, SlotLimiter};

/// Entry point for callers: limit scopes, clean stale holders, list keys.
#[derive(Debug, Clone)]
pub struct Gate {
    store: Arc<dyn SlotStore>,
    limiter: SlotLimiter,
    cleaner: StaleLockCleaner,
    keys: KeyEnumerator,
}

impl Gate {
    /// Create a gate over a connected store.
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self {
            limiter: SlotLimiter::new(store.clone()),
            cleaner: StaleLockCleaner::new(store.clone()),
            keys: KeyEnumerator::new(store.clone()),
            store,
        }
    }

    /// Create a gate over the store selected by configuration.
    pub async fn connect(config: &StoreConfig) -> GateResult<Self> {
        let manager = StoreManager::new(config).await?;
        Ok(Self::new(manager.store()))
    }

    /// See [`SlotLimiter::run_under_limit`].
    pub async fn run_under_limit<F, Fut, T, E>(
        &self,
        descriptor: &LimitDescriptor,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Admission) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<GateError>,
    {
        self.limiter.run_under_limit(descriptor, body).await
    }

    /// See [`StaleLockCleaner::clean_stale`].
    pub async fn clean_stale(&self, descriptor: &LimitDescriptor) -> GateResult<u64> {
        self.cleaner.clean_stale(descriptor).await
    }

    /// See [`KeyEnumerator::list_keys`].
    pub fn list_keys(&self, pattern: &str) -> impl Stream<Item = GateResult<String>> + Send + use<> {
        self.keys.list_keys(pattern)
    }

    /// Current number of recorded holders; a key of the wrong type reads as `0`.
    pub async fn occupancy(&self, descriptor: &LimitDescriptor) -> GateResult<u64> {
        match self.store.occupancy(&descriptor.key).await {
            Err(e) if e.is_wrong_type() => Ok(0),
            result => result,
        }
    }

    /// The underlying limiter.
    pub fn limiter(&self) -> &SlotLimiter {
        &self.limiter
    }

    /// The underlying key enumerator.
    pub fn keys(&self) -> &KeyEnumerator {
        &self.keys
    }

    /// Check that the store is reachable.
    pub async fn health_check(&self) -> GateResult<bool> {
        self.store.health_check().await
    }
}
