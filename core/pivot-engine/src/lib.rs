//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot aggregation for the dashboard data store.
//!
//! This crate groups filtered rows by one or more dimensions and reduces
//! metrics per group. It depends on `engine` only for shared types
//! (CellValue, RowIndex, RowSelection).
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot query IS)
//! - `accumulator`: Incremental per-group state (HOW we reduce)
//! - `view`: Output rows for the dashboard (WHAT we return)
//! - `engine`: Calculation engine (HOW we group)

pub mod accumulator;
pub mod definition;
pub mod engine;
pub mod view;

pub use crate::accumulator::MetricAccumulator;
pub use crate::definition::*;
pub use crate::engine::{aggregate, PivotCalculator};
pub use crate::view::*;
