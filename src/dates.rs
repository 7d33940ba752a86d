use chrono::{Datelike, NaiveDate};

use crate::error::{AppError, Result};
use crate::models::{Table, Value};

/// Polish month names as they appear in the `Miesiące` column.
pub const MONTHS: [(&str, u32); 12] = [
    ("styczeń", 1),
    ("luty", 2),
    ("marzec", 3),
    ("kwiecień", 4),
    ("maj", 5),
    ("czerwiec", 6),
    ("lipiec", 7),
    ("sierpień", 8),
    ("wrzesień", 9),
    ("październik", 10),
    ("listopad", 11),
    ("grudzień", 12),
];

pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim();
    MONTHS.iter().find(|(n, _)| *n == name).map(|(_, m)| *m)
}

/// First day of the month named by `month_name` in `year`.
pub fn canonical_date(year: i32, month_name: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month_number(month_name)?, 1)
}

/// Return a copy of `table` with `date_col` appended, holding the first of
/// the month for every row. Fails on the first row whose month label is not
/// recognised; no partially-normalized table is ever returned.
pub fn add_canonical_date(
    table: &Table,
    year_col: &str,
    month_col: &str,
    date_col: &str,
) -> Result<Table> {
    let year_idx = table.column_index(year_col)?;
    let month_idx = table.column_index(month_col)?;

    let dates = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let label = row[month_idx].to_string();
            let year = row[year_idx]
                .as_i64()
                .and_then(|y| i32::try_from(y).ok())
                .ok_or_else(|| AppError::NonNumeric {
                    row: i + 1,
                    column: year_col.to_string(),
                    value: row[year_idx].to_string(),
                })?;
            canonical_date(year, &label)
                .map(Value::Date)
                .ok_or(AppError::UnknownMonth { row: i + 1, label })
        })
        .collect::<Result<Vec<_>>>()?;

    table.with_column(date_col, dates)
}

/// Parse `YYYY-MM` or `YYYY-MM-DD` into the first of that month.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let full = if raw.len() == 7 { format!("{raw}-01") } else { raw.to_string() };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .map(first_of_month)
        .map_err(|_| AppError::InvalidDate(raw.to_string()))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Move a first-of-month date by `delta` months.
pub fn shift_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + delta;
    NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(date)
}

/// Short label for a baseline period, e.g. `2017-1`.
pub fn period_label(value: &Value) -> String {
    match value {
        Value::Date(d) => format!("{}-{}", d.year(), d.month()),
        other => other.to_string(),
    }
}
