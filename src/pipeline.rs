use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{aggregate, Aggregation};
use crate::baseline::{
    normalize_partitions, normalize_to_baseline, Normalized, NormalizedSeries, SeriesOutcome,
};
use crate::dates::{add_canonical_date, period_label};
use crate::error::Result;
use crate::filter::{filter, FilterSpec, RangeFilter};
use crate::loader::load_table;
use crate::models::{Table, Value};
use crate::settings::Settings;

pub const YEAR: &str = "Rok";
pub const MONTH: &str = "Miesiące";
pub const GENDER: &str = "Płeć";
pub const REGION: &str = "Nazwa";
pub const VALUE: &str = "Wartosc";
pub const EDUCATION: &str = "Poziomy wykształcenia";
/// Column added to the monthly table by date normalization.
pub const DATE: &str = "Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Breakdown {
    Gender,
    Region,
}

impl Breakdown {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Gender => GENDER,
            Self::Region => REGION,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Gender => "Bezrobocie według płci",
            Self::Region => "Bezrobocie według województwa",
        }
    }

    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub fn toggle(&self) -> Self {
        match self {
            Self::Gender => Self::Region,
            Self::Region => Self::Gender,
        }
    }
}

/// Both source tables, prepared once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct DataContext {
    /// Monthly counts with the canonical `Data` column.
    pub monthly: Table,
    /// Yearly totals for the whole country: `Płeć`, `Rok`, `Wartosc`.
    pub yearly: Table,
    pub country_label: String,
    pub total_label: String,
    /// Genders that have whole-country rows.
    genders_with_country: BTreeSet<String>,
    /// Regions that have all-gender total rows.
    regions_with_total: BTreeSet<String>,
}

impl DataContext {
    pub fn load(settings: &Settings) -> Result<Self> {
        let monthly = load_table(&settings.monthly_path(), &settings.encoding)?;
        let yearly = load_table(&settings.yearly_path(), &settings.encoding)?;
        Self::prepare(monthly, yearly, &settings.country_label, &settings.total_label)
    }

    pub fn prepare(
        monthly_raw: Table,
        yearly_raw: Table,
        country_label: &str,
        total_label: &str,
    ) -> Result<Self> {
        let monthly = add_canonical_date(&monthly_raw, YEAR, MONTH, DATE)?;

        let yearly_spec = FilterSpec::new()
            .allow(EDUCATION, [total_label])
            .allow(REGION, [country_label]);
        let yearly = filter(&yearly_raw, &yearly_spec)?.select(&[GENDER, YEAR, VALUE])?;

        let country = Value::from(country_label);
        let total = Value::from(total_label);
        let mut genders_with_country = BTreeSet::new();
        let mut regions_with_total = BTreeSet::new();
        for (region, gender) in monthly.column(REGION)?.zip(monthly.column(GENDER)?) {
            if *region == country {
                genders_with_country.insert(gender.to_string());
            } else if *gender == total {
                regions_with_total.insert(region.to_string());
            }
        }

        info!(
            monthly = monthly.len(),
            yearly = yearly.len(),
            genders_with_country = genders_with_country.len(),
            regions_with_total = regions_with_total.len(),
            "data context ready"
        );
        Ok(Self {
            monthly,
            yearly,
            country_label: country_label.to_string(),
            total_label: total_label.to_string(),
            genders_with_country,
            regions_with_total,
        })
    }

    /// Selectable values for a breakdown. Regions never include the country
    /// aggregate.
    pub fn options(&self, breakdown: Breakdown) -> Result<Vec<String>> {
        Ok(self
            .monthly
            .unique_values(breakdown.column())?
            .into_iter()
            .map(|v| v.to_string())
            .filter(|v| breakdown != Breakdown::Region || *v != self.country_label)
            .collect())
    }

    pub fn date_bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        Ok(self
            .monthly
            .bounds(DATE)?
            .and_then(|(lo, hi)| Some((lo.as_date()?, hi.as_date()?))))
    }

    pub fn year_bounds(&self) -> Result<Option<(i32, i32)>> {
        Ok(self.yearly.bounds(YEAR)?.and_then(|(lo, hi)| {
            Some((
                i32::try_from(lo.as_i64()?).ok()?,
                i32::try_from(hi.as_i64()?).ok()?,
            ))
        }))
    }

    /// Everything selected across the full date range, which is how the
    /// dashboard starts.
    pub fn default_selection(&self, breakdown: Breakdown) -> Result<Selection> {
        let (start, end) = self
            .date_bounds()?
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        Ok(Selection {
            values: self.options(breakdown)?.into_iter().collect(),
            start,
            end,
            baseline: None,
        })
    }

    /// Rows feeding one breakdown. Table A carries country and per-gender
    /// totals next to their parts; each selected value is read at one level
    /// only, so nothing is summed twice. A gender with country rows uses
    /// those, otherwise the sum of its regions. A region with total rows uses
    /// those, otherwise the sum of its genders. The country row is never a
    /// region.
    fn breakdown_rows(&self, breakdown: Breakdown, selection: &Selection) -> Result<Table> {
        let (with_level, pinned_col, pinned) = match breakdown {
            Breakdown::Gender => (&self.genders_with_country, REGION, &self.country_label),
            Breakdown::Region => (&self.regions_with_total, GENDER, &self.total_label),
        };
        let (at_level, summed): (Vec<&str>, Vec<&str>) = selection
            .values
            .iter()
            .map(String::as_str)
            .partition(|v| with_level.contains(*v));

        let mut base =
            FilterSpec::new().range(RangeFilter::new(DATE, selection.start, selection.end));
        if breakdown == Breakdown::Region {
            base = base.exclude(REGION, [self.country_label.as_str()]);
        }
        let pinned_spec = base
            .clone()
            .allow(breakdown.column(), at_level)
            .allow(pinned_col, [pinned.as_str()]);
        let summed_spec = base.allow(breakdown.column(), summed);

        filter(&self.monthly, &pinned_spec)?.concat(&filter(&self.monthly, &summed_spec)?)
    }
}

/// What the user picked: series values plus an inclusive month range.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub values: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub baseline: Option<NaiveDate>,
}

/// Monthly series for one breakdown: absolute sums plus per-series relative
/// values.
#[derive(Debug)]
pub struct SeriesView {
    pub breakdown: Breakdown,
    pub matched_rows: usize,
    pub aggregation: Aggregation,
    pub series: Vec<SeriesOutcome>,
}

#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub date: Value,
    pub series: Value,
    pub value: f64,
    pub relative: Option<f64>,
    /// Period this point's series is indexed to, e.g. `2017-1`.
    pub basis: Option<String>,
}

/// Baseline actually used by one series. `basis` is `None` when the series
/// has no usable baseline (it sums to zero).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesBasis {
    pub series: Value,
    pub basis: Option<String>,
    pub fell_back: bool,
}

impl SeriesView {
    pub fn is_empty(&self) -> bool {
        self.aggregation.is_empty()
    }

    pub fn normalized(&self) -> impl Iterator<Item = &NormalizedSeries> {
        self.series.iter().filter_map(|s| s.result.as_ref().ok())
    }

    /// Basis shared by every normalized series, e.g. `2017-1`.
    pub fn basis_label(&self) -> Option<String> {
        let mut used = self.normalized().map(|s| &s.basis.used);
        let first = used.next()?;
        if used.all(|u| u == first) {
            Some(period_label(first))
        } else {
            None
        }
    }

    pub fn fell_back(&self) -> bool {
        self.normalized().any(|s| s.basis.fell_back)
    }

    /// Per-series baselines, in series order.
    pub fn bases(&self) -> Vec<SeriesBasis> {
        self.series
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(n) => SeriesBasis {
                    series: outcome.series.clone(),
                    basis: Some(period_label(&n.basis.used)),
                    fell_back: n.basis.fell_back,
                },
                Err(_) => SeriesBasis {
                    series: outcome.series.clone(),
                    basis: None,
                    fell_back: false,
                },
            })
            .collect()
    }

    /// Flat rows for listing: one per (date, series), relative value `None`
    /// where the series baseline was undefined.
    pub fn points(&self) -> Vec<SeriesPoint> {
        self.series
            .iter()
            .flat_map(|outcome| {
                let rows: Vec<SeriesPoint> = match &outcome.result {
                    Ok(normalized) => {
                        let basis = period_label(&normalized.basis.used);
                        normalized
                            .points
                            .iter()
                            .map(|p| SeriesPoint {
                                date: p.period.clone(),
                                series: outcome.series.clone(),
                                value: p.measure_sum,
                                relative: Some(p.relative_value),
                                basis: Some(basis.clone()),
                            })
                            .collect()
                    }
                    Err(_) => self
                        .aggregation
                        .rows
                        .iter()
                        .filter(|r| r.key[1] == outcome.series)
                        .map(|r| SeriesPoint {
                            date: r.key[0].clone(),
                            series: outcome.series.clone(),
                            value: r.measure_sum,
                            relative: None,
                            basis: None,
                        })
                        .collect(),
                };
                rows
            })
            .collect()
    }
}

/// Filter → aggregate → normalize for one breakdown. Pure: reads `ctx` only.
pub fn series(
    ctx: &DataContext,
    breakdown: Breakdown,
    selection: &Selection,
) -> Result<SeriesView> {
    let filtered = ctx.breakdown_rows(breakdown, selection)?;
    let aggregation = aggregate(&filtered, &[DATE, breakdown.column()], VALUE)?;
    let baseline = selection.baseline.map(Value::Date);
    let series = normalize_partitions(&aggregation, DATE, breakdown.column(), baseline.as_ref())?;
    debug!(
        ?breakdown,
        matched = filtered.len(),
        groups = aggregation.rows.len(),
        "series recomputed"
    );
    Ok(SeriesView {
        breakdown,
        matched_rows: filtered.len(),
        aggregation,
        series,
    })
}

/// Yearly country totals for the chosen genders and inclusive year range.
pub fn yearly_listing(
    ctx: &DataContext,
    genders: &BTreeSet<String>,
    from_year: i32,
    to_year: i32,
) -> Result<Table> {
    let spec = FilterSpec::new()
        .allow(GENDER, genders.iter().map(String::as_str))
        .range(RangeFilter::new(YEAR, from_year, to_year));
    filter(&ctx.yearly, &spec)
}

/// Yearly totals per gender indexed to the first year in range (100). Fails
/// if any gender's first year sums to zero.
pub fn yearly_index(
    ctx: &DataContext,
    genders: &BTreeSet<String>,
    from_year: i32,
    to_year: i32,
) -> Result<Normalized> {
    let listing = yearly_listing(ctx, genders, from_year, to_year)?;
    let totals = aggregate(&listing, &[YEAR, GENDER], VALUE)?;
    normalize_to_baseline(&totals, YEAR, GENDER, None)
}
