//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - Groups filtered rows and reduces metrics per group.
//!
//! Algorithm:
//! 1. Resolve `group_by` and metric source columns to positions (once)
//! 2. For each selected row, build the group key from the group columns
//! 3. Look the key up (first-seen order is kept), feed every metric accumulator
//! 4. Compute final metric values per group

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use engine::{CellValue, Row, RowIndex, RowSelection};

use crate::accumulator::MetricAccumulator;
use crate::definition::{PivotDefinition, PivotOptions};
use crate::view::{MetricValue, PivotRow};

// ============================================================================
// GROUP STATE
// ============================================================================

/// Working state for one distinct group while rows are being fed.
struct GroupState {
    key: String,
    group_values: SmallVec<[CellValue; 4]>,
    accumulators: Vec<MetricAccumulator>,
    rows: Vec<usize>,
}

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The main calculation engine for pivot queries.
pub struct PivotCalculator<'a> {
    definition: &'a PivotDefinition,
    options: &'a PivotOptions,

    /// Positions of the group-by columns (`None` = column absent).
    group_positions: Vec<Option<usize>>,

    /// Positions of the metric source columns (`None` = column absent).
    metric_positions: Vec<Option<usize>>,
}

impl<'a> PivotCalculator<'a> {
    pub fn new(definition: &'a PivotDefinition, index: &RowIndex, options: &'a PivotOptions) -> Self {
        let group_positions = definition
            .group_by
            .iter()
            .map(|column| index.position(column))
            .collect();
        let metric_positions = definition
            .metrics
            .iter()
            .map(|metric| index.position(&metric.source_column))
            .collect();

        PivotCalculator {
            definition,
            options,
            group_positions,
            metric_positions,
        }
    }

    /// Aggregates the selection. Output order = first-seen group order.
    pub fn calculate(&self, selection: &RowSelection<'_>) -> Vec<PivotRow> {
        let filtered_total = selection.len();
        let mut lookup: FxHashMap<String, usize> = FxHashMap::default();
        let mut groups: Vec<GroupState> = Vec::new();

        for (position, row) in selection.iter() {
            let key = self.group_key(row);

            let slot = match lookup.get(&key) {
                Some(&slot) => slot,
                None => {
                    let slot = groups.len();
                    groups.push(GroupState {
                        key: key.clone(),
                        group_values: self.group_values(row),
                        accumulators: vec![MetricAccumulator::new(); self.definition.metrics.len()],
                        rows: Vec::new(),
                    });
                    lookup.insert(key, slot);
                    slot
                }
            };

            let group = &mut groups[slot];
            group.rows.push(position);
            for (acc, pos) in group.accumulators.iter_mut().zip(&self.metric_positions) {
                acc.add(pos.and_then(|p| row.get(p)), filtered_total);
            }
        }

        groups.into_iter().map(|group| self.finish(group)).collect()
    }

    fn cell<'r>(row: &'r Row, position: Option<usize>) -> Option<&'r CellValue> {
        position.and_then(|p| row.get(p))
    }

    fn group_key(&self, row: &Row) -> String {
        let parts: SmallVec<[String; 4]> = self
            .group_positions
            .iter()
            .map(|&pos| match Self::cell(row, pos) {
                None | Some(CellValue::Empty) => self.options.null_key.clone(),
                Some(value) => value.to_string(),
            })
            .collect();
        parts.join(self.options.key_separator.as_str())
    }

    fn group_values(&self, row: &Row) -> SmallVec<[CellValue; 4]> {
        self.group_positions
            .iter()
            .map(|&pos| Self::cell(row, pos).cloned().unwrap_or_default())
            .collect()
    }

    fn finish(&self, group: GroupState) -> PivotRow {
        let values = self
            .definition
            .metrics
            .iter()
            .zip(&group.accumulators)
            .map(|(metric, acc)| MetricValue {
                name: metric.name.clone(),
                value: acc.compute(
                    metric.reducer,
                    metric.divisor.unwrap_or(self.options.default_divisor),
                ),
            })
            .collect();

        PivotRow {
            key: group.key,
            group_values: group.group_values,
            values,
            rows: group.rows,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Groups `selection` by `definition.group_by` and reduces `definition.metrics`.
/// This is the main entry point for the calculation engine.
pub fn aggregate(
    selection: &RowSelection<'_>,
    index: &RowIndex,
    definition: &PivotDefinition,
    options: &PivotOptions,
) -> Vec<PivotRow> {
    engine::log_enter!(
        "PIVOT",
        "aggregate",
        "rows={} group_by={:?} metrics={}",
        selection.len(),
        definition.group_by,
        definition.metrics.len()
    );
    if let Some(name) = definition.duplicate_metric_name() {
        engine::log_warn!("PIVOT", "metric name {:?} is used more than once, lookups see the first", name);
    }
    let rows = PivotCalculator::new(definition, index, options).calculate(selection);
    engine::log_exit!("PIVOT", "aggregate", "groups={}", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AverageDivisor, MetricField, Reducer};
    use engine::{filter, FilterState, Slice};

    fn create_test_slice() -> Slice {
        serde_json::from_value(serde_json::json!({
            "columns": ["store", "category", "sales", "units"],
            "data": [
                ["North", "Apples", 100, 1],
                ["North", "Oranges", 150, 2],
                ["South", "Apples", 200, 3],
                ["South", "Oranges", 250, 4],
                [null, "Apples", 50, "n/a"]
            ]
        }))
        .unwrap()
    }

    fn run(slice: &Slice, state: &FilterState, definition: &PivotDefinition, options: &PivotOptions) -> Vec<PivotRow> {
        let index = slice.row_index();
        let selection = filter(&index, &slice.data, state);
        aggregate(&selection, &index, definition, options)
    }

    #[test]
    fn test_sum_of_group() {
        let slice: Slice = serde_json::from_value(serde_json::json!({
            "columns": ["g", "x"],
            "data": [["a", 1], ["a", 2], ["a", 3]]
        }))
        .unwrap();
        let def = PivotDefinition::new(["g"], vec![MetricField::sum("x", "x")]);

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("x"), Some(6.0));
    }

    #[test]
    fn test_first_seen_group_order_and_null_sentinel() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(["store"], vec![MetricField::sum("sales", "sales")]);

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["North", "South", "(blank)"]);
        assert_eq!(rows[0].value("sales"), Some(250.0));
        assert_eq!(rows[1].value("sales"), Some(450.0));
        assert_eq!(rows[2].group_values[0], CellValue::Empty);
        assert_eq!(rows[2].rows, vec![4]);
    }

    #[test]
    fn test_multi_dimension_key() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(["store", "category"], vec![MetricField::sum("units", "units")]);
        let options = PivotOptions {
            key_separator: "/".to_string(),
            ..PivotOptions::default()
        };

        let rows = run(&slice, &FilterState::new(), &def, &options);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].key, "North/Apples");
        assert_eq!(rows[4].key, "(blank)/Apples");
        // "n/a" coerces to 0
        assert_eq!(rows[4].value("units"), Some(0.0));
    }

    #[test]
    fn test_average_per_group_mean() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(
            ["store"],
            vec![MetricField::avg("avg_sales", "sales").with_divisor(AverageDivisor::Group)],
        );

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        assert_eq!(rows[0].value("avg_sales"), Some(125.0));
        assert_eq!(rows[1].value("avg_sales"), Some(225.0));
    }

    #[test]
    fn test_average_flat_divisor_uses_filtered_set_size() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(
            ["store"],
            vec![MetricField::avg("avg_sales", "sales").with_divisor(AverageDivisor::FilteredSet)],
        );
        // Only North and South rows survive: the divisor is 4, not 2.
        let state = FilterState::new().with("store", engine::FilterValue::set(["North", "South"]));

        let rows = run(&slice, &state, &def, &PivotOptions::default());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value("avg_sales"), Some(100.0 / 4.0 + 150.0 / 4.0));
        assert_eq!(rows[1].value("avg_sales"), Some(200.0 / 4.0 + 250.0 / 4.0));
    }

    #[test]
    fn test_default_divisor_comes_from_options() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(["store"], vec![MetricField::avg("a", "sales")]);
        let options = PivotOptions {
            default_divisor: AverageDivisor::FilteredSet,
            ..PivotOptions::default()
        };

        let rows = run(&slice, &FilterState::new(), &def, &options);

        assert_eq!(rows[0].value("a"), Some(100.0 / 5.0 + 150.0 / 5.0));
    }

    #[test]
    fn test_missing_columns_do_not_panic() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(
            ["region"],
            vec![MetricField::new("n", "revenue", Reducer::Sum), MetricField::new("c", "sales", Reducer::Count)],
        );

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "(blank)");
        assert_eq!(rows[0].value("n"), Some(0.0));
        assert_eq!(rows[0].value("c"), Some(5.0));
        assert_eq!(rows[0].row_count(), 5);
    }

    #[test]
    fn test_no_group_by_yields_single_total_group() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(Vec::<String>::new(), vec![MetricField::sum("sales", "sales")]);

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "");
        assert_eq!(rows[0].value("sales"), Some(750.0));
    }

    #[test]
    fn test_empty_selection_yields_no_groups() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(["store"], vec![MetricField::avg("a", "sales")]);
        let state = FilterState::new().with("store", "West");

        let rows = run(&slice, &state, &def, &PivotOptions::default());

        assert!(rows.is_empty());
    }

    #[test]
    fn test_duplicate_metric_names_keep_both_values_and_lookup_sees_first() {
        let slice = create_test_slice();
        let def = PivotDefinition::new(
            ["store"],
            vec![MetricField::sum("sales", "sales"), MetricField::new("sales", "sales", Reducer::Max)],
        );

        let rows = run(&slice, &FilterState::new(), &def, &PivotOptions::default());

        let north = &rows[0];
        assert_eq!(north.values.len(), 2);
        assert_eq!(north.values[1].value, 150.0);
        assert_eq!(north.value("sales"), Some(250.0));
    }
}
