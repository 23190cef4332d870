//! FILENAME: core/data-store/src/cache.rs
// PURPOSE: Signature-keyed cache of resolved slices with in-flight de-duplication.
// CONTEXT: Each signature owns a `OnceCell`. Concurrent callers for the same
//          uncached signature wait on the same cell, so only one load runs.
//          A failed load leaves the cell empty and the next caller retries.
//          Entries are never evicted: the key space is bounded by the number
//          of partitions plus the merged fallbacks actually requested. Loads
//          hand back an `Arc`, so several signatures may share one slice.

use rustc_hash::FxHashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

use engine::{log_debug, FilterSignature, RowIndex, Slice};

/// A slice together with its column index, built once at insertion.
#[derive(Debug)]
pub struct CachedSlice {
    pub slice: Slice,
    pub row_index: RowIndex,
}

impl CachedSlice {
    pub fn new(slice: Slice) -> Self {
        let row_index = slice.row_index();
        CachedSlice { slice, row_index }
    }
}

type Entry = Arc<OnceCell<Arc<CachedSlice>>>;

#[derive(Debug, Default)]
pub struct SliceCache {
    entries: Mutex<FxHashMap<FilterSignature, Entry>>,
}

impl SliceCache {
    pub fn new() -> Self {
        SliceCache::default()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<FilterSignature, Entry>> {
        // The map is only touched by non-panicking inserts and lookups.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached slice for `signature`, running `load` at most once
    /// at a time per signature until it succeeds. The `Arc` returned by `load`
    /// is stored as is.
    pub async fn get_or_load<F, Fut, E>(&self, signature: &FilterSignature, load: F) -> Result<Arc<CachedSlice>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<CachedSlice>, E>>,
    {
        let entry = {
            let mut entries = self.lock();
            entries.entry(signature.clone()).or_default().clone()
        };

        if let Some(hit) = entry.get() {
            log_debug!("CACHE", "hit {}", signature);
            return Ok(hit.clone());
        }

        let value = entry
            .get_or_try_init(move || async move {
                log_debug!("CACHE", "miss {}", signature);
                load().await
            })
            .await?;
        Ok(value.clone())
    }

    /// The resolved slice for `signature`, if one is already stored.
    pub fn get(&self, signature: &FilterSignature) -> Option<Arc<CachedSlice>> {
        self.lock().get(signature).and_then(|entry| entry.get().cloned())
    }

    pub fn contains(&self, signature: &FilterSignature) -> bool {
        self.get(signature).is_some()
    }

    /// Signatures with a resolved slice, sorted.
    pub fn signatures(&self) -> Vec<FilterSignature> {
        let mut signatures: Vec<FilterSignature> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.initialized())
            .map(|(signature, _)| signature.clone())
            .collect();
        signatures.sort();
        signatures
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|entry| entry.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
