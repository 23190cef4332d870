//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Definition - The serializable description of a pivot query.
//!
//! This module contains all the types needed to DESCRIBE a pivot:
//! which columns to group by and which metrics to reduce per group.
//! These structures are designed to be:
//! - Serializable (sent by the dashboard as JSON)
//! - Immutable snapshots of user intent

use serde::{Deserialize, Serialize};

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported reducers for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    /// Sum of the numeric-coerced cell (non-numeric counts as 0).
    Sum,
    /// Average, see `AverageDivisor`.
    Avg,
    /// Number of non-blank cells.
    Count,
    /// Smallest numeric cell, 0 when the group has none.
    Min,
    /// Largest numeric cell, 0 when the group has none.
    Max,
}

impl Default for Reducer {
    fn default() -> Self {
        Reducer::Sum
    }
}

/// What an `avg` metric divides by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AverageDivisor {
    /// True per-group mean: group sum / group row count.
    Group,
    /// Each row adds `value / total` where `total` is the size of the whole
    /// filtered row set being aggregated, not the group's size. Matches the
    /// legacy dashboard bit-for-bit.
    FilteredSet,
}

impl Default for AverageDivisor {
    fn default() -> Self {
        AverageDivisor::Group
    }
}

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// A metric reduced once per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricField {
    /// Output name (key in `PivotRow::values`). Names are expected to be
    /// unique; when two metrics share one, `PivotRow::value` sees the first.
    pub name: String,

    /// Column the metric reads.
    pub source_column: String,

    /// The reduction to apply.
    #[serde(default)]
    pub reducer: Reducer,

    /// Only read by `Reducer::Avg`. `None` uses `PivotOptions::default_divisor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<AverageDivisor>,
}

impl MetricField {
    pub fn new(name: impl Into<String>, source_column: impl Into<String>, reducer: Reducer) -> Self {
        MetricField {
            name: name.into(),
            source_column: source_column.into(),
            reducer,
            divisor: None,
        }
    }

    pub fn sum(name: impl Into<String>, source_column: impl Into<String>) -> Self {
        Self::new(name, source_column, Reducer::Sum)
    }

    pub fn avg(name: impl Into<String>, source_column: impl Into<String>) -> Self {
        Self::new(name, source_column, Reducer::Avg)
    }

    /// Pins the divisor of an `avg` metric regardless of store defaults.
    pub fn with_divisor(mut self, divisor: AverageDivisor) -> Self {
        self.divisor = Some(divisor);
        self
    }
}

/// The complete description of a pivot query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotDefinition {
    /// Ordered grouping dimensions (column names).
    #[serde(default)]
    pub group_by: Vec<String>,

    /// Ordered metrics.
    #[serde(default)]
    pub metrics: Vec<MetricField>,
}

impl PivotDefinition {
    pub fn new<S: Into<String>>(group_by: impl IntoIterator<Item = S>, metrics: Vec<MetricField>) -> Self {
        PivotDefinition {
            group_by: group_by.into_iter().map(Into::into).collect(),
            metrics,
        }
    }

    /// First metric name used more than once, if any.
    pub fn duplicate_metric_name(&self) -> Option<&str> {
        self.metrics.iter().enumerate().find_map(|(i, metric)| {
            self.metrics[..i]
                .iter()
                .any(|earlier| earlier.name == metric.name)
                .then_some(metric.name.as_str())
        })
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Key-building and reducer defaults, usually taken from the store config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotOptions {
    /// Joins group values into `PivotRow::key`. Must not occur in the data.
    pub key_separator: String,

    /// Stands in for null / missing group values inside the key.
    pub null_key: String,

    /// Divisor for `avg` metrics that do not pin one.
    pub default_divisor: AverageDivisor,
}

pub const DEFAULT_KEY_SEPARATOR: &str = "||";
pub const DEFAULT_NULL_KEY: &str = "(blank)";

impl Default for PivotOptions {
    fn default() -> Self {
        PivotOptions {
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
            null_key: DEFAULT_NULL_KEY.to_string(),
            default_divisor: AverageDivisor::default(),
        }
    }
}
