//! FILENAME: core/pivot-engine/src/accumulator.rs
//! Metric accumulators - incremental per-group state.
//!
//! One accumulator exists per (group, metric). Rows are fed in order; the
//! final value is computed once every row has been seen.

use engine::CellValue;

use crate::definition::{AverageDivisor, Reducer};

/// Accumulator for computing a metric incrementally.
/// Stores the intermediate state needed for every reducer.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    /// Sum of numeric-coerced values.
    pub sum: f64,
    /// Sum of `value / filtered_total`, the flat-divisor average.
    pub scaled_sum: f64,
    /// Rows fed to this accumulator.
    pub rows: u64,
    /// Rows whose cell was not blank.
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        MetricAccumulator::default()
    }

    /// Adds one row's cell. `filtered_total` is the size of the whole row set
    /// being aggregated (never 0 while rows are being fed).
    pub fn add(&mut self, cell: Option<&CellValue>, filtered_total: usize) {
        let value = cell.map_or(0.0, CellValue::to_number);

        self.rows += 1;
        self.sum += value;
        self.scaled_sum += value / filtered_total as f64;

        if cell.map_or(false, |c| !c.is_blank()) {
            self.count += 1;
        }

        if let Some(n) = cell.and_then(CellValue::as_number) {
            self.min = Some(self.min.map_or(n, |m| m.min(n)));
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }
    }

    /// Computes the final metric value.
    pub fn compute(&self, reducer: Reducer, divisor: AverageDivisor) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Avg => match divisor {
                AverageDivisor::FilteredSet => self.scaled_sum,
                AverageDivisor::Group => {
                    if self.rows > 0 {
                        self.sum / self.rows as f64
                    } else {
                        0.0
                    }
                }
            },
            Reducer::Count => self.count as f64,
            Reducer::Min => self.min.unwrap_or(0.0),
            Reducer::Max => self.max.unwrap_or(0.0),
        }
    }
}
