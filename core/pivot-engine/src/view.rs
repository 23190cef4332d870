//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - The output handed back to the dashboard.
//!
//! One `PivotRow` per distinct group, in first-seen order. Produced fresh per
//! query and never cached.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use engine::CellValue;

/// The value of one metric for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
}

/// An aggregated group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    /// Group values joined with the key separator, null sentinel for blanks.
    pub key: String,

    /// The group's values, one per `group_by` column. Missing columns read as `Empty`.
    pub group_values: SmallVec<[CellValue; 4]>,

    /// Metric results in definition order.
    pub values: Vec<MetricValue>,

    /// Positions (in the aggregated slice) of the rows contributing to this group.
    pub rows: Vec<usize>,
}

impl PivotRow {
    /// Looks up a metric by name. With duplicate names the first metric wins.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|m| m.name == name).map(|m| m.value)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
