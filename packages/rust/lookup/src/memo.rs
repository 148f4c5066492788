//! Per-run memoization of lookup results.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::{EntityLookup, LookupResult};

/// Wraps a lookup so each distinct query reaches the service once.
///
/// Many experts share an employer; without this every listing entry would
/// repeat the same searches.
pub struct MemoLookup<L> {
    inner: L,
    seen: Mutex<HashMap<String, LookupResult>>,
}

impl<L> MemoLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct queries answered so far.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, query: &str) -> Option<LookupResult> {
        self.seen.lock().ok()?.get(query).cloned()
    }
}

impl<L: EntityLookup + Sync> EntityLookup for MemoLookup<L> {
    async fn resolve(&self, query: &str) -> LookupResult {
        if let Some(hit) = self.cached(query) {
            debug!(query, "lookup cache hit");
            return hit;
        }

        let result = self.inner.resolve(query).await;
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(query.to_string(), result.clone());
        }
        result
    }
}
