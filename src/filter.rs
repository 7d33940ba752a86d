use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::models::{Table, Value};

/// Inclusive `[lower, upper]` bound over one column.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub column: String,
    pub lower: Value,
    pub upper: Value,
}

impl RangeFilter {
    pub fn new(column: &str, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.lower > self.upper
    }
}

/// Row selection. A column missing from `allowed` is unconstrained; a column
/// mapped to an empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub allowed: BTreeMap<String, BTreeSet<Value>>,
    pub exclude: BTreeMap<String, BTreeSet<Value>>,
    pub range: Option<RangeFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed
            .insert(column.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.exclude
            .entry(column.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn range(mut self, range: RangeFilter) -> Self {
        self.range = Some(range);
        self
    }
}

/// Return the rows of `table` selected by `spec`, in their original order.
pub fn filter(table: &Table, spec: &FilterSpec) -> Result<Table> {
    let allowed: Vec<(usize, &BTreeSet<Value>)> = spec
        .allowed
        .iter()
        .map(|(c, set)| Ok((table.column_index(c)?, set)))
        .collect::<Result<_>>()?;
    let excluded: Vec<(usize, &BTreeSet<Value>)> = spec
        .exclude
        .iter()
        .map(|(c, set)| Ok((table.column_index(c)?, set)))
        .collect::<Result<_>>()?;
    let range = match &spec.range {
        Some(r) => Some((table.column_index(&r.column)?, r)),
        None => None,
    };

    if allowed.iter().any(|(_, set)| set.is_empty())
        || range.is_some_and(|(_, r)| r.is_inverted())
    {
        return Ok(table.empty_like());
    }

    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            allowed.iter().all(|(i, set)| set.contains(&row[*i]))
                && !excluded.iter().any(|(i, set)| set.contains(&row[*i]))
                && range.map_or(true, |(i, r)| {
                    !row[i].is_null() && row[i] >= r.lower && row[i] <= r.upper
                })
        })
        .cloned()
        .collect();

    Ok(Table::from_parts(table.columns().to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn sample() -> Table {
        let rows = [
            (2017, "mężczyźni", "POLSKA", 100),
            (2017, "kobiety", "POLSKA", 90),
            (2018, "mężczyźni", "POLSKA", 150),
            (2018, "mężczyźni", "MAZOWIECKIE", 20),
            (2020, "kobiety", "MAZOWIECKIE", 15),
            (2021, "ogółem", "POLSKA", 300),
        ];
        Table::new(
            vec!["Rok".into(), "Płeć".into(), "Nazwa".into(), "Wartosc".into()],
            rows.iter()
                .map(|(y, g, n, v)| vec![Value::Int(*y), (*g).into(), (*n).into(), Value::Int(*v)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_filter_by_gender_and_year() {
        let t = sample();
        let spec = FilterSpec::new()
            .allow("Płeć", ["mężczyźni"])
            .range(RangeFilter::new("Rok", 2017, 2018));
        let out = filter(&t, &spec).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.column("Płeć").unwrap().all(|v| *v == Value::from("mężczyźni")));
    }

    #[test]
    fn test_result_is_subset_in_order() {
        let t = sample();
        let spec = FilterSpec::new().allow("Płeć", ["kobiety", "ogółem"]);
        let out = filter(&t, &spec).unwrap();
        assert_eq!(out.len(), 3);
        let mut source = t.rows().iter();
        for row in out.rows() {
            assert!(source.any(|r| r == row), "row not in source or out of order");
        }
    }

    #[test]
    fn test_absent_constraint_passes_everything() {
        let t = sample();
        let out = filter(&t, &FilterSpec::new()).unwrap();
        assert_eq!(out, t);
    }

    #[test]
    fn test_empty_allowed_set_matches_nothing() {
        let t = sample();
        let spec = FilterSpec::new().allow("Nazwa", Vec::<&str>::new());
        let out = filter(&t, &spec).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns(), t.columns());
    }

    #[test]
    fn test_unknown_value_matches_nothing() {
        let t = sample();
        let spec = FilterSpec::new().allow("Nazwa", ["ATLANTYDA"]);
        assert!(filter(&t, &spec).unwrap().is_empty());
    }

    #[test]
    fn test_inverted_range_is_empty_not_error() {
        let t = sample();
        let spec = FilterSpec::new().range(RangeFilter::new("Rok", 2020, 2017));
        assert!(filter(&t, &spec).unwrap().is_empty());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let t = sample();
        let spec = FilterSpec::new().range(RangeFilter::new("Rok", 2018, 2020));
        let years: Vec<_> = filter(&t, &spec)
            .unwrap()
            .column("Rok")
            .unwrap()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(years, vec![2018, 2018, 2020]);
    }

    #[test]
    fn test_exclude_drops_country_aggregate() {
        let t = sample();
        let spec = FilterSpec::new().exclude("Nazwa", ["POLSKA"]);
        let out = filter(&t, &spec).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.column("Nazwa").unwrap().all(|v| *v == Value::from("MAZOWIECKIE")));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let t = sample();
        let spec = FilterSpec::new().allow("Województwo", ["MAZOWIECKIE"]);
        assert!(matches!(filter(&t, &spec), Err(AppError::UnknownColumn(_))));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let t = sample();
        let before = t.clone();
        let spec = FilterSpec::new().allow("Płeć", ["kobiety"]);
        let _ = filter(&t, &spec).unwrap();
        assert_eq!(t, before);
    }
}
