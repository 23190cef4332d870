//! FILENAME: core/engine/src/row_index.rs
//! PURPOSE: Column-name to position lookup for a slice.
//! CONTEXT: Rebuilt per slice and never mutated afterwards. Every row-level
//! operation (filtering, grouping, metric reads) goes through it.

use rustc_hash::FxHashMap;

use crate::cell::CellValue;

/// Maps a column name to its 0-based position in a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowIndex {
    positions: FxHashMap<String, usize>,
}

impl RowIndex {
    /// O(columns). When a name repeats, the first position wins.
    pub fn build<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut positions = FxHashMap::default();
        positions.reserve(columns.len());
        for (i, name) in columns.iter().enumerate() {
            positions.entry(name.as_ref().to_string()).or_insert(i);
        }
        RowIndex { positions }
    }

    /// Position of `column`, or `None` when the slice has no such column.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Reads `column` from `row`. Missing columns and short rows both yield `None`.
    pub fn cell<'r>(&self, row: &'r [CellValue], column: &str) -> Option<&'r CellValue> {
        self.position(column).and_then(|i| row.get(i))
    }
}
