use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{AggregatedRow, Aggregation};
use crate::dates::period_label;
use crate::error::{AppError, Result};
use crate::models::Value;

/// One aggregated row expressed relative to its series' baseline period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineIndex {
    pub key: Vec<Value>,
    pub period: Value,
    pub measure_sum: f64,
    pub relative_value: f64,
}

/// Which period a series was normalized against. `fell_back` is set when a
/// requested period was not present in the series and its earliest period
/// was used instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineBasis {
    pub requested: Option<Value>,
    pub used: Value,
    pub fell_back: bool,
}

impl BaselineBasis {
    pub fn label(&self) -> String {
        format!("100 = {}", period_label(&self.used))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub series: Value,
    pub basis: BaselineBasis,
    pub points: Vec<BaselineIndex>,
}

/// Per-series result of normalization; a zero baseline only fails its own
/// series.
#[derive(Debug)]
pub struct SeriesOutcome {
    pub series: Value,
    pub result: Result<NormalizedSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized {
    pub series: Vec<NormalizedSeries>,
}

#[cfg(test)]
impl Normalized {
    pub fn rows(&self) -> impl Iterator<Item = &BaselineIndex> {
        self.series.iter().flat_map(|s| s.points.iter())
    }
}

fn normalize_series(
    series: &Value,
    rows: &[&AggregatedRow],
    time_idx: usize,
    baseline: Option<&Value>,
) -> Result<NormalizedSeries> {
    let earliest = rows
        .iter()
        .map(|r| &r.key[time_idx])
        .filter(|p| !p.is_null())
        .min()
        .or_else(|| rows.first().map(|r| &r.key[time_idx]))
        .cloned()
        .unwrap_or(Value::Null);

    let requested_present =
        baseline.is_some_and(|b| rows.iter().any(|r| &r.key[time_idx] == b));
    let used = match baseline {
        Some(b) if requested_present => b.clone(),
        _ => earliest,
    };
    let fell_back = baseline.is_some() && !requested_present;
    if fell_back {
        debug!(%series, used = %used, "requested baseline not in view, using earliest period");
    }

    let base: f64 = rows
        .iter()
        .filter(|r| r.key[time_idx] == used)
        .map(|r| r.measure_sum)
        .sum();
    if base == 0.0 {
        warn!(%series, period = %used, "zero baseline");
        return Err(AppError::ZeroBaseline {
            series: series.to_string(),
            period: period_label(&used),
        });
    }

    let points = rows
        .iter()
        .map(|r| BaselineIndex {
            key: r.key.clone(),
            period: r.key[time_idx].clone(),
            measure_sum: r.measure_sum,
            relative_value: r.measure_sum / base * 100.0,
        })
        .collect();

    Ok(NormalizedSeries {
        series: series.clone(),
        basis: BaselineBasis {
            requested: baseline.cloned(),
            used,
            fell_back,
        },
        points,
    })
}

/// Normalize every `category_col` series independently. Errors from one
/// series do not affect the others; only unknown column names fail the call.
pub fn normalize_partitions(
    aggregation: &Aggregation,
    time_col: &str,
    category_col: &str,
    baseline: Option<&Value>,
) -> Result<Vec<SeriesOutcome>> {
    let time_idx = aggregation.key_index(time_col)?;
    let cat_idx = aggregation.key_index(category_col)?;

    let mut partitions: BTreeMap<&Value, Vec<&AggregatedRow>> = BTreeMap::new();
    for row in &aggregation.rows {
        partitions.entry(&row.key[cat_idx]).or_default().push(row);
    }

    Ok(partitions
        .into_iter()
        .map(|(series, rows)| SeriesOutcome {
            series: series.clone(),
            result: normalize_series(series, &rows, time_idx, baseline),
        })
        .collect())
}

/// Like [`normalize_partitions`], but the first series with a zero baseline
/// fails the whole call with [`AppError::ZeroBaseline`].
pub fn normalize_to_baseline(
    aggregation: &Aggregation,
    time_col: &str,
    category_col: &str,
    baseline: Option<&Value>,
) -> Result<Normalized> {
    let series = normalize_partitions(aggregation, time_col, category_col, baseline)?
        .into_iter()
        .map(|o| o.result)
        .collect::<Result<Vec<_>>>()?;
    Ok(Normalized { series })
}
