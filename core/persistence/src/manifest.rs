//! FILENAME: core/persistence/src/manifest.rs
// PURPOSE: The dataset manifest (`index.json`) and its signature index.
// CONTEXT: The manifest is written by the offline partitioner and is read
//          exactly once per data store. It lists the filter facets, one
//          descriptor per physical partition, and the partition file format.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use engine::{log_info, log_warn, CellValue, FilterSignature, FilterState};

use crate::error::DataError;
use crate::source::PartitionSource;

// ============================================================================
// FORMAT
// ============================================================================

/// Encoding of the partition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    /// `{ "columns": [...], "data": [[...], ...] }`
    #[serde(rename = "json")]
    Json,
    /// Header line plus comma-separated rows, no quoting.
    #[serde(rename = "csv")]
    Csv,
    /// Same as `Csv`, gzip-compressed.
    #[serde(rename = "csv.gz")]
    CsvGz,
}

impl Default for DataFormat {
    fn default() -> Self {
        DataFormat::Json
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// One physical partition: its fixed slice key and where to find it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionDescriptor {
    /// Producer-assigned identifier (a short hash of the slice key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// The filter values every row of this partition shares.
    #[serde(default)]
    pub filters: FilterState,

    /// Location relative to the manifest.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl PartitionDescriptor {
    pub fn new(filters: FilterState, path: impl Into<String>) -> Self {
        PartitionDescriptor {
            key: None,
            filters,
            path: path.into(),
            row_count: None,
        }
    }

    /// Index key. Every entry counts, so `{"date": null}` names the
    /// partition of null dates and never the unfiltered dataset.
    pub fn signature(&self) -> FilterSignature {
        self.filters.key_signature()
    }
}

// ============================================================================
// METADATA
// ============================================================================

/// The parsed manifest. Immutable for the lifetime of a data store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// Name of the workbook the dataset was exported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,

    /// Full column list of the dataset.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Facet name -> ordered allowed values.
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<CellValue>>,

    pub partitions: Vec<PartitionDescriptor>,

    #[serde(default)]
    pub format: DataFormat,
}

impl Metadata {
    /// Parses manifest bytes. `path` is only used for error messages.
    pub fn from_slice(bytes: &[u8], path: &str) -> Result<Self, DataError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| DataError::decode(path, e))?;

        if value.get("partitions").map_or(true, serde_json::Value::is_null) {
            return Err(DataError::fetch(path, "manifest has no `partitions` field"));
        }

        serde_json::from_value(value).map_err(|e| DataError::decode(path, e))
    }

    /// Allowed values for one facet, in manifest order.
    pub fn filter_options(&self, name: &str) -> Option<&[CellValue]> {
        self.filters.get(name).map(Vec::as_slice)
    }

    /// Sum of the descriptors' row-count hints (0 when absent).
    pub fn partition_row_hint(&self) -> usize {
        self.partitions
            .iter()
            .filter_map(|p| p.row_count)
            .map(|n| n as usize)
            .sum()
    }

    pub fn index(&self) -> PartitionIndex {
        PartitionIndex::build(&self.partitions)
    }
}

// ============================================================================
// PARTITION INDEX
// ============================================================================

/// Descriptor key signature -> descriptor position in the manifest.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    by_signature: FxHashMap<FilterSignature, usize>,
}

impl PartitionIndex {
    /// When two descriptors share a signature the first one wins.
    pub fn build(partitions: &[PartitionDescriptor]) -> Self {
        let mut by_signature = FxHashMap::default();
        for (i, descriptor) in partitions.iter().enumerate() {
            let signature = descriptor.signature();
            if by_signature.contains_key(&signature) {
                log_warn!(
                    "META",
                    "duplicate partition signature {} ({}), keeping the first",
                    signature,
                    descriptor.path
                );
                continue;
            }
            by_signature.insert(signature, i);
        }
        PartitionIndex { by_signature }
    }

    pub fn get(&self, signature: &FilterSignature) -> Option<usize> {
        self.by_signature.get(signature).copied()
    }

    pub fn len(&self) -> usize {
        self.by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Resolves a manifest-relative partition path against the manifest location.
pub fn resolve_relative(manifest_path: &str, path: &str) -> String {
    match manifest_path.rfind('/') {
        Some(i) => format!("{}/{}", &manifest_path[..i], path.trim_start_matches("./")),
        None => path.trim_start_matches("./").to_string(),
    }
}

/// Fetches and parses the manifest. One read, no retries.
pub async fn load_metadata<S: PartitionSource>(source: &S, path: &str) -> Result<Metadata, DataError> {
    let bytes = source.fetch(path).await?;
    let metadata = Metadata::from_slice(&bytes, path)?;
    log_info!(
        "META",
        "loaded {}: {} partitions, {} facets, format {:?}",
        path,
        metadata.partitions.len(),
        metadata.filters.len(),
        metadata.format
    );
    Ok(metadata)
}
