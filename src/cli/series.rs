use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};
use crate::fmt::{count, relative};
use crate::pipeline::{series, Breakdown, SeriesBasis, SeriesPoint, SeriesView};

#[derive(Serialize)]
struct SeriesJson<'a> {
    title: &'a str,
    basis: Option<String>,
    fell_back: bool,
    bases: Vec<SeriesBasis>,
    undefined: Vec<String>,
    points: Vec<SeriesPoint>,
}

fn undefined_series(view: &SeriesView) -> Vec<String> {
    view.series
        .iter()
        .filter(|s| s.result.is_err())
        .map(|s| s.series.to_string())
        .collect()
}

fn month(point: &SeriesPoint) -> String {
    point
        .date
        .as_date()
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_else(|| point.date.to_string())
}

pub fn run(
    data_dir: Option<&str>,
    by: Breakdown,
    values: &[String],
    from: Option<&str>,
    to: Option<&str>,
    baseline: Option<&str>,
    json: bool,
) -> Result<()> {
    let ctx = super::load_context(data_dir)?;
    let selection = super::build_selection(&ctx, by, values, from, to, baseline)?;
    let view = series(&ctx, by, &selection)?;
    info!(
        rows = view.matched_rows,
        total = view.aggregation.total(),
        series = view.series.len(),
        "selection matched"
    );

    if json {
        let out = SeriesJson {
            title: view.breakdown.title(),
            basis: view.basis_label(),
            fell_back: view.fell_back(),
            bases: view.bases(),
            undefined: undefined_series(&view),
            points: view.points(),
        };
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| AppError::Other(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "{} ({} .. {})",
        view.breakdown.title().bold(),
        selection.start.format("%Y-%m"),
        selection.end.format("%Y-%m")
    );
    if view.is_empty() {
        println!("No data for this selection.");
        return Ok(());
    }

    let rel_header = match view.basis_label() {
        Some(label) => format!("Relatywnie (100 = {label})"),
        None => "Relatywnie".to_string(),
    };
    let mut table = Table::new();
    table.set_header(vec![
        "Data",
        by.column(),
        "Liczba bezrobotnych",
        rel_header.as_str(),
        "Baza",
    ]);
    for p in view.points() {
        let basis = p.basis.as_deref().map(|b| format!("100 = {b}"));
        table.add_row(vec![
            Cell::new(month(&p)),
            Cell::new(&p.series),
            Cell::new(count(p.value)).set_alignment(CellAlignment::Right),
            Cell::new(relative(p.relative)).set_alignment(CellAlignment::Right),
            Cell::new(basis.unwrap_or_else(|| "-".to_string())),
        ]);
    }
    println!("{table}");

    if let Some(requested) = selection.baseline {
        for b in view.bases().iter().filter(|b| b.fell_back) {
            let used = b.basis.as_deref().unwrap_or("-");
            println!(
                "{}",
                format!(
                    "{}: no data for baseline month {}; indexed to its first month {used}.",
                    b.series,
                    requested.format("%Y-%m"),
                )
                .yellow()
            );
        }
    }
    for name in undefined_series(&view) {
        println!(
            "{}",
            format!("{name}: baseline month sums to zero, relative values undefined.").yellow()
        );
    }
    Ok(())
}
