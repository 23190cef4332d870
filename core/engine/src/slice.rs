//! FILENAME: core/engine/src/slice.rs
//! PURPOSE: The tabular payload of one partition (or of several merged ones).
//! CONTEXT: Rows are positional: every row is aligned with `columns`.
//! Slices are immutable once built and shared behind `Arc` by the data store.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::row_index::RowIndex;

/// A single data row, positionally aligned to the slice's columns.
pub type Row = Vec<CellValue>;

/// A decoded partition: `{ columns, data }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub columns: Vec<String>,
    pub data: Vec<Row>,
}

impl Slice {
    pub fn new(columns: Vec<String>, data: Vec<Row>) -> Self {
        Slice { columns, data }
    }

    /// An empty slice that still advertises a schema.
    pub fn empty(columns: Vec<String>) -> Self {
        Slice { columns, data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<&Row> {
        self.data.get(position)
    }

    /// Builds the column-name lookup for this slice.
    pub fn row_index(&self) -> RowIndex {
        RowIndex::build(&self.columns)
    }

    /// Concatenates slices into one, trusting that they share a column order.
    ///
    /// The schema of the first part wins; `fallback_columns` is only used when
    /// there are no parts at all. Callers that care about mismatched schemas
    /// check `same_columns` first.
    pub fn concat<'a, I>(parts: I, fallback_columns: &[String], capacity_hint: usize) -> Slice
    where
        I: IntoIterator<Item = &'a Slice>,
    {
        let mut columns: Option<Vec<String>> = None;
        let mut data = Vec::with_capacity(capacity_hint);

        for part in parts {
            if columns.is_none() {
                columns = Some(part.columns.clone());
            }
            data.extend(part.data.iter().cloned());
        }

        Slice {
            columns: columns.unwrap_or_else(|| fallback_columns.to_vec()),
            data,
        }
    }

    pub fn same_columns(&self, other: &Slice) -> bool {
        self.columns == other.columns
    }
}
