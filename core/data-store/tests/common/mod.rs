//! FILENAME: core/data-store/tests/common/mod.rs
//! Test harness and fixtures for data store integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use data_store::{DataError, DataStore, PartitionSource, StoreConfig};

/// Where the fixture manifest lives inside the source.
pub const MANIFEST: &str = "data/index.json";

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Serves bytes from a map and records every fetch. Clones share state, so a
/// test can keep one handle while the store owns another.
#[derive(Clone, Default)]
pub struct MemorySource {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    pub fn insert(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(path.to_string(), body.into());
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    /// Makes every fetch of `path` take `delay` before answering.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
    }

    /// Every fetched path, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl PartitionSource for MemorySource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
        let path = path.to_string();
        async move {
            self.fetches.lock().unwrap().push(path.clone());
            let delay = self.delays.lock().unwrap().get(&path).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let body = self.files.lock().unwrap().get(&path).cloned();
            body.ok_or_else(|| DataError::fetch(&path, "HTTP 404 Not Found"))
        }
    }
}

// ============================================================================
// SALES FIXTURE
// ============================================================================

/// Monthly sales partitioned by `date`:
///
/// | file   | date    | rows (store, sales)      |
/// |--------|---------|--------------------------|
/// | a.json | 2024-01 | (A, 10) (B, 20) (A, 30)  |
/// | b.json | 2024-02 | (A, 5) (C, 7)            |
pub struct SalesFixture;

impl SalesFixture {
    pub fn columns() -> Vec<&'static str> {
        vec!["date", "store", "sales"]
    }

    pub fn manifest() -> String {
        serde_json::json!({
            "version": 1,
            "source": "sales.xlsx",
            "rowCount": 5,
            "columns": Self::columns(),
            "filters": {
                "date": ["2024-01", "2024-02"],
                "store": ["A", "B", "C"]
            },
            "partitions": [
                {"key": "p0", "filters": {"date": "2024-01"}, "path": "a.json", "rowCount": 3},
                {"key": "p1", "filters": {"date": "2024-02"}, "path": "b.json", "rowCount": 2}
            ],
            "format": "json"
        })
        .to_string()
    }

    pub fn partition_a() -> String {
        serde_json::json!({
            "columns": Self::columns(),
            "data": [
                ["2024-01", "A", 10],
                ["2024-01", "B", 20],
                ["2024-01", "A", 30]
            ]
        })
        .to_string()
    }

    pub fn partition_b() -> String {
        serde_json::json!({
            "columns": Self::columns(),
            "data": [
                ["2024-02", "A", 5],
                ["2024-02", "C", 7]
            ]
        })
        .to_string()
    }

    /// Source holding the manifest and both partitions under `data/`.
    pub fn source() -> MemorySource {
        let source = MemorySource::new();
        source.insert(MANIFEST, Self::manifest());
        source.insert("data/a.json", Self::partition_a());
        source.insert("data/b.json", Self::partition_b());
        source
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// A store over a `MemorySource`, plus a handle to inspect its fetches.
pub struct TestHarness {
    pub source: MemorySource,
    pub store: DataStore<MemorySource>,
}

impl TestHarness {
    /// Store over the sales fixture with default configuration.
    pub async fn new() -> Self {
        Self::with_config(StoreConfig::default()).await
    }

    pub async fn with_config(config: StoreConfig) -> Self {
        Self::with_source(SalesFixture::source(), config).await
    }

    pub async fn with_source(source: MemorySource, mut config: StoreConfig) -> Self {
        config.manifest_path = MANIFEST.to_string();
        let store = DataStore::open(source.clone(), config)
            .await
            .expect("fixture store should open");
        TestHarness { source, store }
    }

    /// Fetches made after the manifest read.
    pub fn partition_fetches(&self) -> Vec<String> {
        self.source
            .fetches()
            .into_iter()
            .filter(|p| p != MANIFEST)
            .collect()
    }
}
