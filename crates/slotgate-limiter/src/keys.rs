//! Enumeration of bookkeeping keys for operational tooling.

use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};

use slotgate_core::result::GateResult;
use slotgate_core::traits::slot_store::SlotStore;

/// Lists keys matching a glob pattern.
#[derive(Debug, Clone)]
pub struct KeyEnumerator {
    /// Store to scan.
    store: Arc<dyn SlotStore>,
}

impl KeyEnumerator {
    /// Create an enumerator over a connected store.
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Lazily stream every key matching `pattern`.
    ///
    /// Pages are fetched from the store as the stream is polled. There is no
    /// ordering guarantee, and a key may be reported more than once if the
    /// keyspace changes during the scan. Call again to restart.
    pub fn list_keys(&self, pattern: &str) -> impl Stream<Item = GateResult<String>> + Send + use<> {
        let store = self.store.clone();
        let pattern = pattern.to_string();

        stream::try_unfold(Some(0u64), move |cursor| {
            next_page(store.clone(), pattern.clone(), cursor)
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok)))
        .try_flatten()
    }

    /// Collect every key matching `pattern`.
    pub async fn collect_keys(&self, pattern: &str) -> GateResult<Vec<String>> {
        self.list_keys(pattern).try_collect().await
    }
}

/// Fetch the page at `cursor`; `None` once the previous page was the last.
async fn next_page(
    store: Arc<dyn SlotStore>,
    pattern: String,
    cursor: Option<u64>,
) -> GateResult<Option<(Vec<String>, Option<u64>)>> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let page = store.scan_keys(&pattern, cursor).await?;
    let next = if page.is_last() {
        None
    } else {
        Some(page.cursor)
    };

    Ok(Some((page.items, next)))
}
