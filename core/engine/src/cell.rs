//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the value held by a single cell of a partition row.
//! CONTEXT: Partitions arrive either as JSON (`null`, numbers, strings, booleans)
//! or as delimited text (always strings). `CellValue` covers both shapes and
//! provides the numeric coercion used by pivot metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw data within a cell.
/// Serialized untagged so that a JSON partition row decodes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// True for `null` and for the empty string.
    /// Both mean "no constraint" when used as a filter value.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion for metric reduction.
    /// Anything that does not read as a finite number counts as 0.
    pub fn to_number(&self) -> f64 {
        let n = match self {
            CellValue::Empty => 0.0,
            CellValue::Number(n) => *n,
            CellValue::Boolean(b) => {
                if *b { 1.0 } else { 0.0 }
            }
            CellValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if n.is_nan() { 0.0 } else { n }
    }

    /// Returns the value as a number only when the cell actually holds one
    /// (or text that parses as one). Used by min/max, which skip blanks.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }

    /// Canonical JSON text of the value, used when a total order is needed
    /// (signature building, set de-duplication).
    pub fn canonical_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}
