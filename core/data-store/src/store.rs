//! FILENAME: core/data-store/src/store.rs
// PURPOSE: The data store: current filter state, partition resolution, pivot queries.
// CONTEXT: One instance per dashboard. Shared behind `Arc`; every operation
//          takes `&self` and may run concurrently with the others.
//
// Resolution of a filter state:
// 1. signature of the state -> cache hit returns immediately
// 2. exact partition for the signature -> fetch it, cache under the signature
// 3. otherwise fetch every partition concurrently and concatenate them into
//    the merged superset (built once per store), cache it under the requested
//    signature, and filter it client-side
//
// Filter updates replace the state wholesale and bump a generation counter.
// A `set_filters` whose resolution finishes after a newer update started
// returns `StoreError::Superseded` instead of its rows.

use futures_util::future::try_join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;

use engine::{
    filter, log_debug, log_enter, log_exit, log_info, log_warn, FilterSignature, FilterState, Row,
    RowIndex, RowSelection, Slice,
};
use persistence::{
    load_metadata, load_partition, resolve_relative, AnySource, DataError, Metadata,
    PartitionDescriptor, PartitionIndex, PartitionSource,
};
use pivot_engine::{aggregate, PivotDefinition, PivotOptions, PivotRow};

use crate::cache::{CachedSlice, SliceCache};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{FilterChange, Listeners, Subscription};

// ============================================================================
// RESULTS
// ============================================================================

/// Rows matching a filter state, borrowed from a cached slice.
#[derive(Debug, Clone)]
pub struct ResolvedRows {
    source: Arc<CachedSlice>,
    positions: Option<Vec<usize>>,
    filters: Arc<FilterState>,
    signature: FilterSignature,
}

impl ResolvedRows {
    /// The filtered view over the resolved slice.
    pub fn selection(&self) -> RowSelection<'_> {
        match &self.positions {
            None => RowSelection::all(&self.source.slice.data),
            Some(positions) => RowSelection::from_positions(&self.source.slice.data, positions.clone()),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        let data = &self.source.slice.data;
        let positions = self.positions.as_deref();
        let len = positions.map_or(data.len(), <[usize]>::len);
        (0..len).filter_map(move |i| match positions {
            None => data.get(i),
            Some(p) => data.get(p[i]),
        })
    }

    pub fn len(&self) -> usize {
        self.positions.as_ref().map_or(self.source.slice.len(), Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_index(&self) -> &RowIndex {
        &self.source.row_index
    }

    pub fn columns(&self) -> &[String] {
        &self.source.slice.columns
    }

    /// The whole cached slice the rows were filtered from (partition or merge).
    pub fn slice(&self) -> &Slice {
        &self.source.slice
    }

    /// The filter state these rows were resolved for.
    pub fn filters(&self) -> &Arc<FilterState> {
        &self.filters
    }

    pub fn signature(&self) -> &FilterSignature {
        &self.signature
    }

    /// Row by its position in `slice()`, as reported in `PivotRow::rows`.
    pub fn row_at(&self, position: usize) -> Option<&Row> {
        self.source.slice.row(position)
    }
}

/// Pivot rows plus the resolved rows they were computed from.
#[derive(Debug, Clone)]
pub struct PivotResult {
    pub rows: Vec<PivotRow>,
    pub source: ResolvedRows,
}

// ============================================================================
// DATA STORE
// ============================================================================

pub struct DataStore<S: PartitionSource = AnySource> {
    source: S,
    config: StoreConfig,
    pivot_options: PivotOptions,
    metadata: Metadata,
    partitions: PartitionIndex,
    cache: SliceCache,
    /// Every partition concatenated. Shared by all signatures with no exact partition.
    merged: OnceCell<Arc<CachedSlice>>,
    filters: RwLock<Arc<FilterState>>,
    generation: AtomicU64,
    listeners: Listeners,
}

impl<S: PartitionSource> std::fmt::Debug for DataStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("manifest_path", &self.config.manifest_path)
            .field("partitions", &self.metadata.partitions.len())
            .field("cached", &self.cache.len())
            .field("generation", &self.generation())
            .field("filters", &self.filters())
            .finish()
    }
}

impl DataStore<AnySource> {
    /// Builds the configured source, then opens the store on it.
    pub async fn from_config(config: StoreConfig) -> Result<Self, StoreError> {
        let source = config.build_source()?;
        Self::open(source, config).await
    }
}

impl<S: PartitionSource> DataStore<S> {
    /// Loads the manifest (one read) and indexes its partitions.
    pub async fn open(source: S, config: StoreConfig) -> Result<Self, StoreError> {
        log_enter!("STORE", "open", "manifest={}", config.manifest_path);
        let metadata = load_metadata(&source, &config.manifest_path).await?;
        let partitions = metadata.index();
        let filters = Arc::new(config.initial_filters.clone());
        let pivot_options = config.pivot_options();
        log_exit!("STORE", "open", "partitions={}", partitions.len());

        Ok(DataStore {
            source,
            config,
            pivot_options,
            metadata,
            partitions,
            cache: SliceCache::new(),
            merged: OnceCell::new(),
            filters: RwLock::new(filters),
            generation: AtomicU64::new(0),
            listeners: Listeners::new(),
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read-only snapshot of the current filter state.
    pub fn filters(&self) -> Arc<FilterState> {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `set_filters` calls so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Signatures currently held in the cache.
    pub fn cached_signatures(&self) -> Vec<FilterSignature> {
        self.cache.signatures()
    }

    // ------------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------------

    /// Resolves rows for the current filter state without changing it.
    pub async fn bootstrap(&self) -> Result<ResolvedRows, StoreError> {
        log_enter!("STORE", "bootstrap");
        let resolved = self.resolve(self.filters()).await?;
        log_exit!("STORE", "bootstrap", "rows={}", resolved.len());
        Ok(resolved)
    }

    /// Shallow-merges `patch` into the filter state, notifies subscribers,
    /// then resolves rows for the new state.
    pub async fn set_filters(&self, patch: &FilterState) -> Result<ResolvedRows, StoreError> {
        let (generation, snapshot) = {
            let mut current = self.filters.write().unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(current.merge(patch));
            *current = next.clone();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (generation, next)
        };
        log_enter!("STORE", "set_filters", "generation={} signature={}", generation, snapshot.signature());

        self.listeners.notify(&FilterChange {
            filters: snapshot.clone(),
            generation,
        });

        let resolved = self.resolve(snapshot).await?;

        let current = self.generation();
        if current != generation {
            log_info!("STORE", "set_filters generation {} superseded by {}", generation, current);
            return Err(StoreError::Superseded { generation, current });
        }

        log_exit!("STORE", "set_filters", "rows={}", resolved.len());
        Ok(resolved)
    }

    /// Resolves the current filter state and aggregates it.
    pub async fn query(&self, definition: &PivotDefinition) -> Result<PivotResult, StoreError> {
        let resolved = self.resolve(self.filters()).await?;
        let rows = aggregate(
            &resolved.selection(),
            resolved.row_index(),
            definition,
            &self.pivot_options,
        );
        Ok(PivotResult { rows, source: resolved })
    }

    /// Registers `callback` for filter changes.
    pub fn on_filters_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FilterChange) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    async fn resolve(&self, filters: Arc<FilterState>) -> Result<ResolvedRows, StoreError> {
        let signature = filters.signature();
        let source = self
            .cache
            .get_or_load(&signature, || self.load_for_signature(&signature))
            .await?;

        let positions = filter(&source.row_index, &source.slice.data, &filters).into_positions();

        Ok(ResolvedRows {
            source,
            positions,
            filters,
            signature,
        })
    }

    async fn load_for_signature(&self, signature: &FilterSignature) -> Result<Arc<CachedSlice>, DataError> {
        match self.partitions.get(signature) {
            Some(i) => {
                let descriptor = &self.metadata.partitions[i];
                log_info!("STORE", "exact partition {} for {}", descriptor.path, signature);
                Ok(Arc::new(CachedSlice::new(self.fetch_descriptor(descriptor).await?)))
            }
            None => {
                log_info!("STORE", "no partition for {}, filtering the merged superset", signature);
                let merged = self
                    .merged
                    .get_or_try_init(|| async {
                        let slice = self.merge_all().await?;
                        Ok::<_, DataError>(Arc::new(CachedSlice::new(slice)))
                    })
                    .await?;
                Ok(merged.clone())
            }
        }
    }

    /// Fetches every partition concurrently and concatenates them in manifest
    /// order. Any failure fails the whole merge.
    async fn merge_all(&self) -> Result<Slice, DataError> {
        log_info!("STORE", "merging all {} partitions", self.metadata.partitions.len());
        let parts = try_join_all(
            self.metadata
                .partitions
                .iter()
                .enumerate()
                .map(|(i, descriptor)| self.partition(i, descriptor)),
        )
        .await?;

        if let Some(first) = parts.first() {
            if let Some(odd) = parts.iter().find(|p| !p.slice.same_columns(&first.slice)) {
                log_warn!(
                    "STORE",
                    "merging partitions with different columns: {:?} vs {:?}",
                    first.slice.columns,
                    odd.slice.columns
                );
            }
        }

        let capacity = parts.iter().map(|p| p.slice.len()).sum();
        let merged = Slice::concat(parts.iter().map(|p| &p.slice), &self.metadata.columns, capacity);
        log_debug!(
            "STORE",
            "merged {} partitions into {} rows (manifest hint {})",
            parts.len(),
            merged.len(),
            self.metadata.partition_row_hint()
        );
        Ok(merged)
    }

    /// One partition through the cache, keyed by its own signature.
    ///
    /// A descriptor shadowed by an earlier one with the same signature is
    /// fetched directly, otherwise the merge would count the first one twice.
    async fn partition(&self, i: usize, descriptor: &PartitionDescriptor) -> Result<Arc<CachedSlice>, DataError> {
        let signature = descriptor.signature();
        if self.partitions.get(&signature) != Some(i) {
            return Ok(Arc::new(CachedSlice::new(self.fetch_descriptor(descriptor).await?)));
        }
        self.cache
            .get_or_load(&signature, || async {
                let slice = self.fetch_descriptor(descriptor).await?;
                Ok::<_, DataError>(Arc::new(CachedSlice::new(slice)))
            })
            .await
    }

    async fn fetch_descriptor(&self, descriptor: &PartitionDescriptor) -> Result<Slice, DataError> {
        let location = resolve_relative(&self.config.manifest_path, &descriptor.path);
        load_partition(&self.source, &location, self.metadata.format).await
    }
}
