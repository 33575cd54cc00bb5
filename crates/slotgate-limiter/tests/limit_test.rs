//! Integration tests for scoped slot acquisition against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::sleep;

use slotgate_core::error::GateError;
use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::{ScanPage, SlotStore};
use slotgate_core::types::LimitDescriptor;
use slotgate_limiter::Gate;
use slotgate_store::memory::MemorySlotStore;

fn setup() -> (MemorySlotStore, Gate) {
    let store = MemorySlotStore::new();
    let gate = Gate::new(Arc::new(store.clone()));
    (store, gate)
}

fn descriptor(limit: u32, timeout_secs: u64) -> LimitDescriptor {
    LimitDescriptor::new("key-1", limit).with_timeout(Duration::from_secs(timeout_secs))
}

/// Start `callers` concurrent scopes that each hold their slot for `hold`.
async fn run_concurrently(
    gate: &Gate,
    descriptor: &LimitDescriptor,
    callers: usize,
    hold: Duration,
) -> Vec<Result<u64, GateError>> {
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let gate = gate.clone();
            let descriptor = descriptor.clone();
            tokio::spawn(async move {
                gate.run_under_limit(&descriptor, |admission| async move {
                    sleep(hold).await;
                    Ok::<_, GateError>(admission.occupancy)
                })
                .await
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("caller task panicked"))
        .collect()
}

#[tokio::test]
async fn test_limit_without_concurrency() {
    let (store, gate) = setup();
    let d = descriptor(1, 10);

    let occupancy = gate
        .run_under_limit(&d, |admission| async move {
            Ok::<_, GateError>(admission.occupancy)
        })
        .await
        .unwrap();

    assert_eq!(occupancy, 1);
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_uncontended_admission_for_any_limit() {
    let (_, gate) = setup();

    for limit in [1, 2, 7, 500] {
        let d = LimitDescriptor::new(format!("group-{limit}"), limit);
        let occupancy = gate
            .run_under_limit(&d, |admission| async move {
                Ok::<_, GateError>(admission.occupancy)
            })
            .await
            .unwrap();
        assert_eq!(occupancy, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_holders_see_distinct_occupancy() {
    let (store, gate) = setup();
    let d = descriptor(10, 0);

    let results = run_concurrently(&gate, &d, 10, Duration::from_secs(1)).await;

    let mut seen: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_within_limit() {
    let (_, gate) = setup();
    let d = descriptor(1, 0);

    let results = run_concurrently(&gate, &d, 1, Duration::from_secs(1)).await;
    assert!(results[0].is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_exceeded_limit_without_timeout() {
    let (store, gate) = setup();
    let d = descriptor(1, 0);

    let results = run_concurrently(&gate, &d, 10, Duration::from_secs(1)).await;

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let exceeded = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_limit_exceeded()))
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(exceeded, 9);
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exceeded_limit_within_timeout() {
    let (_, gate) = setup();
    let d = descriptor(5, 5);

    let results = run_concurrently(&gate, &d, 10, Duration::from_secs(1)).await;

    for result in &results {
        assert!(result.is_ok(), "unexpected failure: {result:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_exceeded_limit_exceeded_timeout() {
    let (_, gate) = setup();
    let d = descriptor(5, 5);

    let results = run_concurrently(&gate, &d, 10, Duration::from_secs(10)).await;

    let exceeded: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .collect();
    assert!(!exceeded.is_empty());
    for err in exceeded {
        assert_eq!(
            err.to_string(),
            "Exceeded the concurrency limit of 5 executions. Waited for 5 seconds."
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_nested_scope_within_lease_is_rejected() {
    let (_, gate) = setup();
    let d = descriptor(1, 0).with_lease(Duration::from_secs(5));

    let inner = gate
        .run_under_limit(&d, |_| {
            let gate = &gate;
            let d = &d;
            async move {
                sleep(Duration::from_secs(1)).await;
                let inner: Result<(), GateError> =
                    gate.run_under_limit(d, |_| async { Ok(()) }).await;
                Ok::<_, GateError>(inner)
            }
        })
        .await
        .unwrap();

    assert!(matches!(inner, Err(GateError::LimitExceeded { limit: 1, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_nested_scope_after_lease_expiry_is_admitted() {
    let (_, gate) = setup();
    let d = descriptor(1, 0).with_lease(Duration::from_secs(5));

    let inner = gate
        .run_under_limit(&d, |_| {
            let gate = &gate;
            let d = &d;
            async move {
                sleep(Duration::from_secs(10)).await;
                let inner = gate
                    .run_under_limit(d, |admission| async move {
                        sleep(Duration::from_secs(1)).await;
                        Ok::<_, GateError>(admission.occupancy)
                    })
                    .await;
                Ok::<_, GateError>(inner)
            }
        })
        .await
        .unwrap();

    assert_eq!(inner.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_high_load_never_exceeds_limit() {
    let (store, gate) = setup();
    let d = descriptor(500, 1);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..10_000)
        .map(|_| {
            let gate = gate.clone();
            let d = d.clone();
            let running = running.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                gate.run_under_limit(&d, |admission| async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    assert!((1..=500).contains(&admission.occupancy));

                    sleep(Duration::from_millis(1500)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, GateError>(())
                })
                .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("caller task panicked"))
        .collect();

    assert!(peak.load(Ordering::SeqCst) <= 500);
    assert!(results.iter().any(|r| r.is_ok()));
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(e) if e.is_limit_exceeded()))
    );
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

#[derive(Debug)]
enum JobError {
    Gate(GateError),
    Failed(&'static str),
}

impl From<GateError> for JobError {
    fn from(err: GateError) -> Self {
        Self::Gate(err)
    }
}

#[tokio::test]
async fn test_body_error_propagates_after_release() {
    let (store, gate) = setup();
    let d = descriptor(1, 0);

    let result: Result<(), JobError> = gate
        .run_under_limit(&d, |_| async { Err(JobError::Failed("boom")) })
        .await;

    assert!(matches!(result, Err(JobError::Failed("boom"))));
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);

    // The slot is free again.
    let result: Result<u64, JobError> = gate
        .run_under_limit(&d, |admission| async move { Ok(admission.occupancy) })
        .await;
    assert_eq!(result.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_limit_exceeded_converts_into_caller_error() {
    let (store, gate) = setup();
    let d = descriptor(1, 0);
    store.set_field("key-1", "someone-else", "99999999999").await.unwrap();

    let result: Result<(), JobError> = gate
        .run_under_limit(&d, |_| async { Err(JobError::Failed("must not run")) })
        .await;

    assert!(matches!(
        result,
        Err(JobError::Gate(GateError::LimitExceeded { limit: 1, .. }))
    ));
    assert_eq!(store.occupancy("key-1").await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_scope_releases_slot() {
    let (store, gate) = setup();
    let d = descriptor(1, 0);

    let task = {
        let gate = gate.clone();
        let d = d.clone();
        tokio::spawn(async move {
            gate.run_under_limit(&d, |_| async {
                sleep(Duration::from_secs(60)).await;
                Ok::<_, GateError>(())
            })
            .await
        })
    };

    sleep(Duration::from_secs(1)).await;
    assert_eq!(store.occupancy("key-1").await.unwrap(), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

/// Memory store whose removals take a while to complete.
#[derive(Debug)]
struct SlowReleaseStore {
    inner: MemorySlotStore,
    delay: Duration,
}

#[async_trait]
impl SlotStore for SlowReleaseStore {
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
        self.inner.insert_holder(key, holder, lease_expiry, ttl).await
    }

    async fn remove_holders(&self, key: &str, holders: &[String]) -> GateResult<u64> {
        sleep(self.delay).await;
        self.inner.remove_holders(key, holders).await
    }

    async fn scan_holders(
        &self,
        key: &str,
        cursor: u64,
    ) -> GateResult<ScanPage<(String, String)>> {
        self.inner.scan_holders(key, cursor).await
    }

    async fn delete(&self, key: &str) -> GateResult<bool> {
        self.inner.delete(key).await
    }

    async fn scan_keys(&self, pattern: &str, cursor: u64) -> GateResult<ScanPage<String>> {
        self.inner.scan_keys(pattern, cursor).await
    }

    async fn health_check(&self) -> GateResult<bool> {
        Ok(true)
    }
}

#[tokio::test(start_paused = true)]
async fn test_scope_cancelled_during_release_still_frees_slot() {
    let inner = MemorySlotStore::new();
    let gate = Gate::new(Arc::new(SlowReleaseStore {
        inner: inner.clone(),
        delay: Duration::from_millis(200),
    }));
    let d = descriptor(1, 0);

    let scope = gate.run_under_limit(&d, |_| async { Ok::<_, GateError>(()) });
    let timed_out = tokio::time::timeout(Duration::from_millis(100), scope).await;
    assert!(timed_out.is_err());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(inner.occupancy("key-1").await.unwrap(), 0);

    let occupancy = gate
        .run_under_limit(&d, |admission| async move {
            Ok::<_, GateError>(admission.occupancy)
        })
        .await
        .unwrap();
    assert_eq!(occupancy, 1);
}

#[tokio::test]
async fn test_zero_poll_interval_still_times_out() {
    let (store, gate) = setup();
    store.set_field("key-1", "someone-else", "99999999999").await.unwrap();
    let d = LimitDescriptor::new("key-1", 1)
        .with_timeout(Duration::from_millis(50))
        .with_poll_interval(Duration::ZERO);

    let result: Result<(), GateError> = gate.run_under_limit(&d, |_| async { Ok(()) }).await;
    assert!(result.unwrap_err().is_limit_exceeded());
}

#[tokio::test]
async fn test_oversized_lease_is_rejected_before_acquiring() {
    let (store, gate) = setup();
    let ran = AtomicUsize::new(0);
    let counter = &ran;

    for lease in [
        LimitDescriptor::MAX_LEASE + Duration::from_secs(1),
        Duration::from_secs(u64::MAX),
    ] {
        let d = descriptor(1, 0).with_lease(lease);
        let result: Result<(), GateError> = gate
            .run_under_limit(&d, |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(GateError::Validation(_))));
    }

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_wrong_type_key_is_recovered_silently() {
    let (store, gate) = setup();
    store.set_plain("key-1", "3").await;
    let d = descriptor(2, 0);

    let occupancy = gate
        .run_under_limit(&d, |admission| async move {
            Ok::<_, GateError>(admission.occupancy)
        })
        .await
        .unwrap();

    assert_eq!(occupancy, 1);
    assert_eq!(store.occupancy("key-1").await.unwrap(), 0);
}

/// Store whose every command fails as if the server were unreachable.
#[derive(Debug)]
struct UnreachableStore;

#[async_trait]
impl SlotStore for UnreachableStore {
    async fn occupancy(&self, _key: &str) -> GateResult<u64> {
        Err(GateError::store("connection refused"))
    }

    async fn insert_holder(
        &self,
        _key: &str,
        _holder: &str,
        _lease_expiry: i64,
        _ttl: Duration,
    ) -> GateResult<u64> {
        Err(GateError::store("connection refused"))
    }

    async fn remove_holders(&self, _key: &str, _holders: &[String]) -> GateResult<u64> {
        Err(GateError::store("connection refused"))
    }

    async fn scan_holders(
        &self,
        _key: &str,
        _cursor: u64,
    ) -> GateResult<ScanPage<(String, String)>> {
        Err(GateError::store("connection refused"))
    }

    async fn delete(&self, _key: &str) -> GateResult<bool> {
        Err(GateError::store("connection refused"))
    }

    async fn scan_keys(&self, _pattern: &str, _cursor: u64) -> GateResult<ScanPage<String>> {
        Err(GateError::store("connection refused"))
    }

    async fn health_check(&self) -> GateResult<bool> {
        Err(GateError::store("connection refused"))
    }
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let gate = Gate::new(Arc::new(UnreachableStore));
    let d = descriptor(1, 10);
    let ran = AtomicUsize::new(0);
    let counter = &ran;

    let result: Result<(), GateError> = gate
        .run_under_limit(&d, |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(GateError::Store { .. })));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}
