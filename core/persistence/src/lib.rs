//! FILENAME: core/persistence/src/lib.rs
//! Dataset I/O for the dashboard data store.
//!
//! Reads the manifest written by the offline partitioner and decodes partition
//! files (JSON, CSV, gzip-compressed CSV) from an HTTP or directory source.

mod error;
mod manifest;
mod partition_reader;
mod source;

pub use error::DataError;
pub use manifest::{
    load_metadata, resolve_relative, DataFormat, Metadata, PartitionDescriptor, PartitionIndex,
};
pub use partition_reader::{decode_csv, decode_json, decode_partition, load_partition};
pub use source::{AnySource, DirectorySource, HttpSource, PartitionSource};

/// Default manifest location relative to the source root.
pub const MANIFEST_FILE_NAME: &str = "index.json";
