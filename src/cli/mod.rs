#[cfg(feature = "tui")]
pub mod dashboard;
pub mod init;
pub mod series;
pub mod table;
pub mod values;

use clap::{ArgAction, Parser, Subcommand};

use crate::dates::parse_month;
use crate::error::Result;
use crate::pipeline::{Breakdown, DataContext, Selection};
use crate::settings::{load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "bezrobocie",
    about = "Polish unemployment statistics by gender, voivodship and year."
)]
pub struct Cli {
    /// Directory holding the source CSVs (overrides the configured one)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save the data directory and file encoding to the settings file.
    Init {
        /// Text encoding of the CSVs, e.g. utf-8 or windows-1250
        #[arg(long)]
        encoding: Option<String>,
    },
    /// Monthly unemployment series with values relative to a baseline month.
    Series {
        /// Split series by gender or by voivodship
        #[arg(long, value_enum, default_value = "gender")]
        by: Breakdown,
        /// Series to include (repeatable; default: all)
        #[arg(long = "value")]
        values: Vec<String>,
        /// First month: YYYY-MM
        #[arg(long = "from")]
        from: Option<String>,
        /// Last month: YYYY-MM
        #[arg(long = "to")]
        to: Option<String>,
        /// Baseline month: YYYY-MM (default: first month in view)
        #[arg(long)]
        baseline: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Yearly country totals by gender.
    Table {
        /// Gender to include (repeatable; default: all)
        #[arg(long = "gender")]
        genders: Vec<String>,
        #[arg(long = "from-year")]
        from_year: Option<i32>,
        #[arg(long = "to-year")]
        to_year: Option<i32>,
        /// Index each gender to its first year in range (100)
        #[arg(long)]
        relative: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the values available for a breakdown.
    Values {
        #[arg(long, value_enum, default_value = "gender")]
        by: Breakdown,
    },
    /// Interactive dashboard with charts and the yearly table.
    #[cfg(feature = "tui")]
    Dashboard {
        /// Sleep this many milliseconds on every recomputation (demo only)
        #[arg(long = "demo-latency")]
        demo_latency: Option<u64>,
    },
}

pub(crate) fn resolve_settings(data_dir: Option<&str>) -> Settings {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(dir);
    }
    settings
}

pub(crate) fn load_context(data_dir: Option<&str>) -> Result<DataContext> {
    DataContext::load(&resolve_settings(data_dir))
}

/// Turn command-line choices into a selection; anything unset falls back to
/// the dashboard's initial state.
pub(crate) fn build_selection(
    ctx: &DataContext,
    by: Breakdown,
    values: &[String],
    from: Option<&str>,
    to: Option<&str>,
    baseline: Option<&str>,
) -> Result<Selection> {
    let mut selection = ctx.default_selection(by)?;
    if !values.is_empty() {
        selection.values = values.iter().cloned().collect();
    }
    if let Some(f) = from {
        selection.start = parse_month(f)?;
    }
    if let Some(t) = to {
        selection.end = parse_month(t)?;
    }
    selection.baseline = baseline.map(parse_month).transpose()?;
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::pipeline::tests::context;
    use chrono::NaiveDate;

    #[test]
    fn test_build_selection_defaults_to_everything() {
        let ctx = context();
        let sel = build_selection(&ctx, Breakdown::Gender, &[], None, None, None).unwrap();
        assert_eq!(sel.values.len(), 3);
        assert_eq!(sel.start, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(sel.end, NaiveDate::from_ymd_opt(2017, 2, 1).unwrap());
        assert!(sel.baseline.is_none());
    }

    #[test]
    fn test_build_selection_overrides() {
        let ctx = context();
        let sel = build_selection(
            &ctx,
            Breakdown::Region,
            &["OPOLSKIE".to_string()],
            Some("2017-02"),
            None,
            Some("2017-02"),
        )
        .unwrap();
        assert_eq!(sel.values.len(), 1);
        assert_eq!(sel.start, NaiveDate::from_ymd_opt(2017, 2, 1).unwrap());
        assert_eq!(sel.baseline, Some(sel.start));
    }

    #[test]
    fn test_build_selection_rejects_bad_month() {
        let ctx = context();
        let err = build_selection(&ctx, Breakdown::Gender, &[], Some("2017/02"), None, None);
        assert!(matches!(err, Err(AppError::InvalidDate(_))));
    }

    #[test]
    fn test_cli_parses_repeated_values() {
        let cli = Cli::try_parse_from([
            "bezrobocie", "series", "--by", "region", "--value", "MAZOWIECKIE", "--value",
            "OPOLSKIE", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Series { by, values, json, .. } => {
                assert_eq!(by, Breakdown::Region);
                assert_eq!(values.len(), 2);
                assert!(json);
            }
            _ => panic!("expected series command"),
        }
    }
}
