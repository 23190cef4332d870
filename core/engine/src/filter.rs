//! FILENAME: core/engine/src/filter.rs
//! PURPOSE: Filter state, its canonical signature, and the row filter.
//! CONTEXT: A `FilterState` maps a filter name (a column) to a scalar or to a
//! set of accepted values. It is used three ways:
//! - as the user's current selection (owned by the data store),
//! - as a partition descriptor's fixed slice key,
//! - through `signature()`, as the cache / partition lookup key.
//!
//! Filtering fails open: unconstrained entries and entries naming a column the
//! slice does not have never exclude a row.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cell::CellValue;
use crate::row_index::RowIndex;
use crate::slice::Row;

// ============================================================================
// FILTER VALUES
// ============================================================================

/// The constraint for one filter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Set membership. An empty set is unconstrained, not "match nothing".
    Set(Vec<CellValue>),
    /// Equality. `null` and `""` are unconstrained.
    Scalar(CellValue),
}

impl FilterValue {
    pub fn scalar(value: impl Into<CellValue>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        FilterValue::Set(values.into_iter().map(Into::into).collect())
    }

    /// True when this entry matches every row.
    pub fn is_unconstrained(&self) -> bool {
        match self {
            FilterValue::Scalar(v) => v.is_blank(),
            FilterValue::Set(values) => values.is_empty(),
        }
    }

    /// Tests one cell. A missing cell (short row) reads as `Empty`.
    pub fn matches(&self, cell: Option<&CellValue>) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        let cell = cell.unwrap_or(&CellValue::Empty);
        match self {
            FilterValue::Scalar(expected) => cell == expected,
            FilterValue::Set(values) => values.iter().any(|v| v == cell),
        }
    }

    fn canonical_text(&self) -> String {
        match self {
            FilterValue::Scalar(v) => v.canonical_text(),
            FilterValue::Set(values) => {
                let mut members: Vec<String> = values.iter().map(|v| v.canonical_text()).collect();
                members.sort();
                members.dedup();
                format!("[{}]", members.join(","))
            }
        }
    }
}

impl From<CellValue> for FilterValue {
    fn from(value: CellValue) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(CellValue::from(value))
    }
}

// ============================================================================
// FILTER STATE
// ============================================================================

/// Mapping filter-name -> constraint. Keys are kept sorted.
///
/// The data store never mutates a published state; `merge` builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    entries: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    /// Builder-style insert, mostly for tests and call sites building patches.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that actually restrict rows.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.iter().filter(|(_, v)| !v.is_unconstrained())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no entry restricts rows.
    pub fn is_unconstrained(&self) -> bool {
        self.constraints().next().is_none()
    }

    /// Shallow merge: every key in `patch` overwrites the same key here.
    pub fn merge(&self, patch: &FilterState) -> FilterState {
        let mut entries = self.entries.clone();
        for (name, value) in &patch.entries {
            entries.insert(name.clone(), value.clone());
        }
        FilterState { entries }
    }

    /// Canonical, order-stable encoding of what this state selects. Used as
    /// the cache key and to look up an exact partition.
    ///
    /// Keys are sorted, unconstrained entries are left out, set members are
    /// de-duplicated and sorted. Equal constraints always give equal signatures.
    pub fn signature(&self) -> FilterSignature {
        Self::encode(self.constraints())
    }

    /// Same encoding as `signature`, but every entry is kept, including
    /// `null`, `""` and `[]`.
    ///
    /// Partition descriptors are keyed this way: a partition holding the rows
    /// whose date is null is not the unfiltered dataset, so its key must not
    /// collide with the signature of an unconstrained state.
    pub fn key_signature(&self) -> FilterSignature {
        Self::encode(self.iter())
    }

    fn encode<'s>(entries: impl Iterator<Item = (&'s str, &'s FilterValue)>) -> FilterSignature {
        let mut out = String::from("{");
        for (i, (name, value)) in entries.enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&serde_json::to_string(name).unwrap_or_default());
            out.push(':');
            out.push_str(&value.canonical_text());
        }
        out.push('}');
        FilterSignature(out)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterState {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        FilterState {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ============================================================================
// SIGNATURE
// ============================================================================

/// Canonical string form of a `FilterState`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilterSignature(String);

impl FilterSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ROW FILTERING
// ============================================================================

/// An order-preserving subsequence of a slice's rows.
///
/// `positions == None` means "every row", produced without scanning.
#[derive(Debug, Clone)]
pub struct RowSelection<'a> {
    rows: &'a [Row],
    positions: Option<Vec<usize>>,
}

impl<'a> RowSelection<'a> {
    pub fn all(rows: &'a [Row]) -> Self {
        RowSelection { rows, positions: None }
    }

    /// `positions` must be ascending and in bounds.
    pub fn from_positions(rows: &'a [Row], positions: Vec<usize>) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(positions.last().map_or(true, |&p| p < rows.len()));
        RowSelection { rows, positions: Some(positions) }
    }

    pub fn len(&self) -> usize {
        self.positions.as_ref().map_or(self.rows.len(), Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the selection is the whole input.
    pub fn is_all(&self) -> bool {
        self.positions.is_none()
    }

    /// The underlying rows the positions refer to.
    pub fn source(&self) -> &'a [Row] {
        self.rows
    }

    /// Iterates `(position in source, row)` in source order.
    pub fn iter(&self) -> SelectionIter<'_, 'a> {
        SelectionIter {
            rows: self.rows,
            positions: self.positions.as_deref(),
            cursor: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.iter().map(|(_, row)| row)
    }

    /// Gives up the borrow, keeping only which rows were selected.
    pub fn into_positions(self) -> Option<Vec<usize>> {
        self.positions
    }
}

pub struct SelectionIter<'s, 'a> {
    rows: &'a [Row],
    positions: Option<&'s [usize]>,
    cursor: usize,
}

impl<'s, 'a> Iterator for SelectionIter<'s, 'a> {
    type Item = (usize, &'a Row);

    fn next(&mut self) -> Option<Self::Item> {
        let position = match self.positions {
            None => self.cursor,
            Some(positions) => *positions.get(self.cursor)?,
        };
        let row = self.rows.get(position)?;
        self.cursor += 1;
        Some((position, row))
    }
}

/// Applies `state` to `rows`, preserving their relative order.
///
/// An empty state returns the input untouched without scanning. Entries that
/// are unconstrained, or that name a column missing from `index`, are no-ops.
pub fn filter<'a>(index: &RowIndex, rows: &'a [Row], state: &FilterState) -> RowSelection<'a> {
    if state.is_empty() {
        return RowSelection::all(rows);
    }

    let predicates: Vec<(usize, &FilterValue)> = state
        .constraints()
        .filter_map(|(name, value)| index.position(name).map(|pos| (pos, value)))
        .collect();

    if predicates.is_empty() {
        return RowSelection::all(rows);
    }

    let positions: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| predicates.iter().all(|(pos, value)| value.matches(row.get(*pos))))
        .map(|(i, _)| i)
        .collect();

    crate::log_debug!(
        "FILTER",
        "kept {} of {} rows ({} predicates)",
        positions.len(),
        rows.len(),
        predicates.len()
    );

    RowSelection::from_positions(rows, positions)
}
