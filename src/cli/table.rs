use std::collections::BTreeSet;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::baseline::Normalized;
use crate::error::{AppError, Result};
use crate::fmt::{count, relative};
use crate::pipeline::{yearly_index, yearly_listing, Breakdown, VALUE};

pub fn run(
    data_dir: Option<&str>,
    genders: &[String],
    from_year: Option<i32>,
    to_year: Option<i32>,
    relative: bool,
    json: bool,
) -> Result<()> {
    let ctx = super::load_context(data_dir)?;
    let genders: BTreeSet<String> = if genders.is_empty() {
        ctx.options(Breakdown::Gender)?.into_iter().collect()
    } else {
        genders.iter().cloned().collect()
    };
    let (min_year, max_year) = ctx.year_bounds()?.unwrap_or((i32::MIN, i32::MAX));
    let (from_year, to_year) = (from_year.unwrap_or(min_year), to_year.unwrap_or(max_year));
    if relative {
        let index = yearly_index(&ctx, &genders, from_year, to_year)?;
        return print_index(&index, json);
    }
    let listing = yearly_listing(&ctx, &genders, from_year, to_year)?;

    if json {
        let text = serde_json::to_string_pretty(&listing.to_records())
            .map_err(|e| AppError::Other(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!("{}", "Bezrobocie w Polsce dla danych lat i płci".bold());
    if listing.is_empty() {
        println!("No data for this selection.");
        return Ok(());
    }

    let value_idx = listing.column_index(VALUE)?;
    let mut table = Table::new();
    table.set_header(listing.columns().to_vec());
    for row in listing.rows() {
        let cells: Vec<Cell> = row
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == value_idx {
                    let text = v.as_f64().map(count).unwrap_or_else(|| v.to_string());
                    Cell::new(text).set_alignment(CellAlignment::Right)
                } else {
                    Cell::new(v)
                }
            })
            .collect();
        table.add_row(cells);
    }
    println!("{table}");
    Ok(())
}

fn print_index(index: &Normalized, json: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(index).map_err(|e| AppError::Other(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!("{}", "Bezrobocie w Polsce rok do roku".bold());
    if index.series.is_empty() {
        println!("No data for this selection.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Płeć", "Rok", "Wartosc", "Relatywnie", "Baza"]);
    for series in &index.series {
        let basis = series.basis.label();
        for p in &series.points {
            table.add_row(vec![
                Cell::new(&series.series),
                Cell::new(&p.period),
                Cell::new(count(p.measure_sum)).set_alignment(CellAlignment::Right),
                Cell::new(relative(Some(p.relative_value))).set_alignment(CellAlignment::Right),
                Cell::new(&basis),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}
