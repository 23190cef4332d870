//! FILENAME: core/data-store/src/lib.rs
//! The dashboard data store.
//!
//! Owns the filter state of one dashboard and turns it into rows: an exact
//! partition when the manifest has one for the current signature, otherwise
//! every partition merged and filtered client-side. Resolved slices are cached
//! per signature and concurrent requests for the same signature share a fetch.
//!
//! Layers:
//! - `config`: JSON store configuration (source, pivot defaults, initial filters)
//! - `cache`: Signature-keyed slice cache with in-flight de-duplication
//! - `events`: Filter-change subscriptions
//! - `store`: The `DataStore` itself

mod cache;
mod config;
mod error;
mod events;
mod store;

pub use cache::{CachedSlice, SliceCache};
pub use config::{SourceConfig, StoreConfig};
pub use error::StoreError;
pub use events::{FilterChange, Listeners, Subscription};
pub use store::{DataStore, PivotResult, ResolvedRows};

// The shared types callers need to drive a store.
pub use engine::{CellValue, FilterSignature, FilterState, FilterValue, Row, RowSelection, Slice};
pub use persistence::{
    AnySource, DataError, DataFormat, DirectorySource, HttpSource, Metadata, PartitionDescriptor,
    PartitionSource,
};
pub use pivot_engine::{
    AverageDivisor, MetricField, PivotDefinition, PivotOptions, PivotRow, Reducer,
};
