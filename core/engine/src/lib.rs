//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Shared data types and pure row operations for the dashboard data store.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//! Nothing in this crate performs I/O; fetching lives in `persistence` and
//! orchestration in `data-store`.

pub mod cell;
pub mod filter;
pub mod logging;
pub mod row_index;
pub mod slice;

// Re-export commonly used types at the crate root
pub use cell::CellValue;
pub use filter::{filter, FilterSignature, FilterState, FilterValue, RowSelection, SelectionIter};
pub use row_index::RowIndex;
pub use slice::{Row, Slice};
