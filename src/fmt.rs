/// Format a count with thousands separators: 1 234 567. Fractions are
/// rounded to the nearest unit.
pub fn count(val: f64) -> String {
    let negative = val < 0.0;
    let digits = format!("{:.0}", val.abs());

    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative && grouped != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Relative index with one decimal, or a marker when the baseline was zero.
pub fn relative(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{v:.1}"),
        None => "undefined".to_string(),
    }
}

/// Compact axis label: 950, 12.5k, 1.2M.
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
pub fn compact(val: f64) -> String {
    let abs = val.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", val / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.0}k", val / 1000.0)
    } else if abs >= 1000.0 {
        format!("{:.1}k", val / 1000.0)
    } else {
        format!("{val:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_formatting() {
        assert_eq!(count(1234567.0), "1 234 567");
        assert_eq!(count(-500.0), "-500");
        assert_eq!(count(0.0), "0");
        assert_eq!(count(999.6), "1 000");
        assert_eq!(count(42.0), "42");
    }

    #[test]
    fn test_relative_formatting() {
        assert_eq!(relative(Some(100.0)), "100.0");
        assert_eq!(relative(Some(87.26)), "87.3");
        assert_eq!(relative(None), "undefined");
    }

    #[test]
    fn test_compact_formatting() {
        assert_eq!(compact(950.0), "950");
        assert_eq!(compact(1260.0), "1.3k");
        assert_eq!(compact(45_000.0), "45k");
        assert_eq!(compact(1_260_000.0), "1.3M");
    }
}
