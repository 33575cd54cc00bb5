//! Scoped slot acquisition with guaranteed release.
//!
//! An attempt probes the group's occupancy, and only when there is room
//! inserts its holder entry and re-reads the occupancy in one batch. A
//! holder that finds itself over the limit after inserting removes its own
//! entry again, so racing callers self-correct without a server-side script.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::SlotStore;
use slotgate_core::types::{HolderId, LimitDescriptor};

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// A slot was taken; carries the occupancy observed right after insertion.
    Admitted(u64),
    /// The group was full, or this holder lost the race and backed out.
    Rejected,
}

/// Handed to a scope body once it has been admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Holder id recorded for this scope.
    pub holder_id: HolderId,
    /// Number of holders in the group including this one, at admission time.
    ///
    /// Distinct among holders admitted concurrently, but not a sequence
    /// number: it repeats once earlier holders have left.
    pub occupancy: u64,
}

/// Runs scopes under a per-key concurrency limit.
#[derive(Debug, Clone)]
pub struct SlotLimiter {
    /// Store holding the bookkeeping hashes.
    store: Arc<dyn SlotStore>,
}

impl SlotLimiter {
    /// Create a limiter over a connected store.
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Run `body` once a slot in `descriptor`'s group is free.
    ///
    /// Fails with [`GateError::LimitExceeded`] (converted into `E`) when no
    /// slot was obtained within the descriptor's timeout; the body never runs
    /// in that case. Errors returned by the body are passed through unchanged.
    /// The holder entry is removed on every exit path, including when the
    /// returned future is dropped mid-scope.
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
        descriptor.validate()?;

        let holder_id = HolderId::new();
        let guard = ReleaseGuard::new(self.store.clone(), &descriptor.key, holder_id);

        let outcome = match self.acquire(descriptor, holder_id).await {
            Ok(occupancy) => {
                debug!(key = %descriptor.key, holder = %holder_id, occupancy, "Slot acquired");
                body(Admission {
                    holder_id,
                    occupancy,
                })
                .await
            }
            Err(e) => Err(e.into()),
        };

        match (guard.release().await, outcome) {
            (Ok(_), outcome) => outcome,
            (Err(release_err), Ok(_)) => Err(release_err.into()),
            (Err(release_err), Err(e)) => {
                warn!(
                    key = %descriptor.key,
                    holder = %holder_id,
                    error = %release_err,
                    "Failed to release slot after scope error"
                );
                Err(e)
            }
        }
    }

    /// Retry [`try_acquire`](Self::try_acquire) until admitted or timed out.
    async fn acquire(&self, descriptor: &LimitDescriptor, holder_id: HolderId) -> GateResult<u64> {
        let start = Instant::now();
        let mut attempts = 0u64;

        loop {
            attempts = attempts.saturating_add(1);

            match self.try_acquire(descriptor, holder_id).await? {
                Attempt::Admitted(occupancy) => return Ok(occupancy),
                Attempt::Rejected => {
                    let elapsed = start.elapsed();
                    if elapsed > descriptor.timeout {
                        warn!(
                            key = %descriptor.key,
                            limit = descriptor.limit,
                            attempts,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Concurrency limit exceeded"
                        );
                        return Err(GateError::limit_exceeded(
                            descriptor.limit,
                            descriptor.timeout,
                        ));
                    }

                    debug!(key = %descriptor.key, attempts, "No free slot, retrying");
                    sleep(descriptor.poll_interval).await;
                }
            }
        }
    }

    /// Make one attempt to take a slot for `holder_id`.
    ///
    /// A key that holds something other than a hash is deleted and the probe
    /// repeated immediately.
    pub async fn try_acquire(
        &self,
        descriptor: &LimitDescriptor,
        holder_id: HolderId,
    ) -> GateResult<Attempt> {
        let key = descriptor.key.as_str();
        let limit = u64::from(descriptor.limit);
        let field = holder_id.as_field();

        loop {
            let occupancy = match self.store.occupancy(key).await {
                Err(e) if e.is_wrong_type() => {
                    self.reset(key).await?;
                    continue;
                }
                result => result?,
            };

            if occupancy >= limit {
                return Ok(Attempt::Rejected);
            }

            let expiry = descriptor.lease_expiry_from_now();
            let count = match self
                .store
                .insert_holder(key, &field, expiry, descriptor.lease)
                .await
            {
                Err(e) if e.is_wrong_type() => {
                    self.reset(key).await?;
                    continue;
                }
                result => result?,
            };

            if count > limit {
                debug!(key, holder = %holder_id, count, limit, "Lost the race, backing out");
                match self.store.remove_holders(key, &[field]).await {
                    Err(e) if e.is_wrong_type() => {}
                    result => {
                        result?;
                    }
                }
                return Ok(Attempt::Rejected);
            }

            return Ok(Attempt::Admitted(count));
        }
    }

    /// Remove `holder_id` from the group. Removing an absent holder is a no-op.
    pub async fn release(&self, descriptor: &LimitDescriptor, holder_id: HolderId) -> GateResult<u64> {
        remove_holder(self.store.as_ref(), &descriptor.key, holder_id).await
    }

    /// Delete a key that holds an incompatible value.
    async fn reset(&self, key: &str) -> GateResult<()> {
        info!(key, "Key holds a non-hash value, resetting");
        self.store.delete(key).await?;
        Ok(())
    }
}

/// Delete a single holder entry, treating a non-hash key as already empty.
async fn remove_holder(store: &dyn SlotStore, key: &str, holder_id: HolderId) -> GateResult<u64> {
    match store.remove_holders(key, &[holder_id.as_field()]).await {
        Err(e) if e.is_wrong_type() => Ok(0),
        result => result,
    }
}

/// Removes a holder entry when the scope ends, even if it ends by being dropped.
struct ReleaseGuard {
    store: Arc<dyn SlotStore>,
    key: String,
    holder_id: HolderId,
    armed: bool,
}

impl ReleaseGuard {
    fn new(store: Arc<dyn SlotStore>, key: &str, holder_id: HolderId) -> Self {
        Self {
            store,
            key: key.to_string(),
            holder_id,
            armed: true,
        }
    }

    /// Remove the entry. Stays armed until the removal has completed, so a
    /// scope cancelled mid-release still hands the removal to `Drop`.
    async fn release(mut self) -> GateResult<u64> {
        let result = remove_holder(self.store.as_ref(), &self.key, self.holder_id).await;
        self.armed = false;
        result
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(key = %self.key, holder = %self.holder_id, "Scope dropped outside a runtime, slot left to expire");
            return;
        };

        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        let holder_id = self.holder_id;

        handle.spawn(async move {
            if let Err(e) = remove_holder(store.as_ref(), &key, holder_id).await {
                warn!(key = %key, holder = %holder_id, error = %e, "Failed to release dropped scope");
            }
        });
    }
}
