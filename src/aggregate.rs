use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Table, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub key: Vec<Value>,
    pub measure_sum: f64,
}

/// Grouped sums, one row per distinct key, ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub group_by: Vec<String>,
    pub measure: String,
    pub rows: Vec<AggregatedRow>,
}

impl Aggregation {
    pub fn key_index(&self, column: &str) -> Result<usize> {
        self.group_by
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| AppError::UnknownColumn(column.to_string()))
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.measure_sum).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sum `measure` over every distinct combination of `group_by` values.
pub fn aggregate(table: &Table, group_by: &[&str], measure: &str) -> Result<Aggregation> {
    let key_idx: Vec<usize> = group_by
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_>>()?;
    let measure_idx = table.column_index(measure)?;

    let mut groups: BTreeMap<Vec<Value>, f64> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let value = &row[measure_idx];
        let amount = match value {
            Value::Null => 0.0,
            v => v.as_f64().ok_or_else(|| AppError::NonNumeric {
                row: i + 1,
                column: measure.to_string(),
                value: v.to_string(),
            })?,
        };
        let key: Vec<Value> = key_idx.iter().map(|&k| row[k].clone()).collect();
        *groups.entry(key).or_insert(0.0) += amount;
    }

    Ok(Aggregation {
        group_by: group_by.iter().map(|c| c.to_string()).collect(),
        measure: measure.to_string(),
        rows: groups
            .into_iter()
            .map(|(key, measure_sum)| AggregatedRow { key, measure_sum })
            .collect(),
    })
}
