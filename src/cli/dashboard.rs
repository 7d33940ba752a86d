use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table as TableWidget,
    },
    Frame,
};
use tracing::debug;

use crate::dates::shift_months;
use crate::error::{AppError, Result};
use crate::fmt::{compact, count};
use crate::models::{Table, Value};
use crate::pipeline::{
    series, yearly_listing, Breakdown, DataContext, Selection, SeriesView, VALUE,
};
use crate::tui::{
    run_screen, series_color, Screen, ScreenAction, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE,
    WARNING_STYLE,
};

const TITLE: &str = "Bezrobocie w Polsce przed pandemią i po pandemii COVID-19";
const KEYS: &str =
    "↑↓ move  space toggle  a all/none  tab płeć/województwo  [ ] start  { } end  q quit";

/// One chart line: label, color and (month index, value) points.
type ChartLine = (String, Color, Vec<(f64, f64)>);

fn month_index(date: &Value) -> Option<f64> {
    date.as_date()
        .map(|d| f64::from(d.year() * 12 + d.month0() as i32))
}

fn month_label(x: f64) -> String {
    let m = x.round() as i32;
    format!("{}-{:02}", m.div_euclid(12), m.rem_euclid(12) + 1)
}

pub struct Dashboard<'a> {
    ctx: &'a DataContext,
    breakdown: Breakdown,
    options: Vec<String>,
    gender_selected: BTreeSet<String>,
    region_selected: BTreeSet<String>,
    cursor: usize,
    bounds: (NaiveDate, NaiveDate),
    start: NaiveDate,
    end: NaiveDate,
    demo_latency: Option<Duration>,
    view: Option<SeriesView>,
    listing: Option<Table>,
    error: Option<String>,
}

impl<'a> Dashboard<'a> {
    pub fn new(ctx: &'a DataContext, demo_latency: Option<Duration>) -> Result<Self> {
        let bounds = ctx
            .date_bounds()?
            .ok_or_else(|| AppError::Other("monthly table has no rows".into()))?;
        let mut dashboard = Self {
            ctx,
            breakdown: Breakdown::Gender,
            options: ctx.options(Breakdown::Gender)?,
            gender_selected: ctx.options(Breakdown::Gender)?.into_iter().collect(),
            region_selected: ctx.options(Breakdown::Region)?.into_iter().collect(),
            cursor: 0,
            bounds,
            start: bounds.0,
            end: bounds.1,
            demo_latency,
            view: None,
            listing: None,
            error: None,
        };
        dashboard.recompute();
        Ok(dashboard)
    }

    fn selected(&self) -> &BTreeSet<String> {
        match self.breakdown {
            Breakdown::Gender => &self.gender_selected,
            Breakdown::Region => &self.region_selected,
        }
    }

    fn selected_mut(&mut self) -> &mut BTreeSet<String> {
        match self.breakdown {
            Breakdown::Gender => &mut self.gender_selected,
            Breakdown::Region => &mut self.region_selected,
        }
    }

    fn recompute(&mut self) {
        if let Some(delay) = self.demo_latency {
            std::thread::sleep(delay);
        }
        let selection = Selection {
            values: self.selected().clone(),
            start: self.start,
            end: self.end,
            baseline: None,
        };
        self.error = None;
        match series(self.ctx, self.breakdown, &selection) {
            Ok(view) => self.view = Some(view),
            Err(e) => {
                self.view = None;
                self.error = Some(e.to_string());
            }
        }
        match yearly_listing(self.ctx, &self.gender_selected, self.start.year(), self.end.year()) {
            Ok(listing) => self.listing = Some(listing),
            Err(e) => {
                self.listing = None;
                self.error = Some(e.to_string());
            }
        }
        debug!(start = %self.start, end = %self.end, "dashboard refreshed");
    }

    fn toggle_current(&mut self) {
        let Some(name) = self.options.get(self.cursor).cloned() else {
            return;
        };
        let selected = self.selected_mut();
        if !selected.remove(&name) {
            selected.insert(name);
        }
    }

    fn toggle_all(&mut self) {
        let all: BTreeSet<String> = self.options.iter().cloned().collect();
        let selected = self.selected_mut();
        if *selected == all {
            selected.clear();
        } else {
            *selected = all;
        }
    }

    fn switch_breakdown(&mut self) {
        self.breakdown = self.breakdown.toggle();
        self.options = match self.ctx.options(self.breakdown) {
            Ok(o) => o,
            Err(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }
        };
        self.cursor = 0;
    }

    fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.bounds.0, self.bounds.1)
    }

    fn chart_lines(&self, view: &SeriesView) -> (Vec<ChartLine>, Vec<ChartLine>) {
        let mut absolute: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        let mut relative: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for p in view.points() {
            let Some(x) = month_index(&p.date) else {
                continue;
            };
            let name = p.series.to_string();
            absolute.entry(name.clone()).or_default().push((x, p.value));
            if let Some(rel) = p.relative {
                relative.entry(name).or_default().push((x, rel));
            }
        }
        let color = |name: &str| {
            let idx = self.options.iter().position(|o| o == name).unwrap_or(0);
            series_color(idx)
        };
        let to_lines = |map: BTreeMap<String, Vec<(f64, f64)>>| -> Vec<ChartLine> {
            map.into_iter()
                .map(|(name, pts)| {
                    let c = color(&name);
                    (name, c, pts)
                })
                .collect()
        };
        (to_lines(absolute), to_lines(relative))
    }

    fn draw_options(&self, frame: &mut Frame, area: Rect) {
        let selected = self.selected();
        let lines: Vec<Line> = self
            .options
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mark = if selected.contains(name) { "[x]" } else { "[ ]" };
                let line = Line::from(vec![
                    Span::styled("■ ", Style::default().fg(series_color(i))),
                    Span::raw(format!("{mark} {name}")),
                ]);
                if i == self.cursor {
                    line.style(SELECTED_STYLE)
                } else {
                    line
                }
            })
            .collect();
        let heading = match self.breakdown {
            Breakdown::Gender => "Płeć",
            Breakdown::Region => "Województwo",
        };
        let visible = area.height.saturating_sub(2) as usize;
        let offset = self.cursor.saturating_sub(visible.saturating_sub(1));
        let block = Block::default()
            .title(Span::styled(heading, HEADER_STYLE))
            .borders(Borders::ALL);
        frame.render_widget(
            Paragraph::new(lines).block(block).scroll((offset as u16, 0)),
            area,
        );
    }

    fn draw_listing(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Span::styled("Bezrobocie w Polsce dla danych lat i płci", HEADER_STYLE))
            .borders(Borders::ALL);
        let Some(listing) = self.listing.as_ref().filter(|l| !l.is_empty()) else {
            frame.render_widget(
                Paragraph::new("No data for this selection.").block(block),
                area,
            );
            return;
        };
        let value_idx = listing.column_index(VALUE).ok();
        let header = Row::new(listing.columns().to_vec()).style(FOOTER_STYLE);
        let rows: Vec<Row> = listing
            .rows()
            .iter()
            .map(|r| {
                Row::new(r.iter().enumerate().map(|(i, v)| match v.as_f64() {
                    Some(n) if Some(i) == value_idx => count(n),
                    _ => v.to_string(),
                }))
            })
            .collect();
        let widths = vec![Constraint::Ratio(1, 3); listing.columns().len()];
        frame.render_widget(TableWidget::new(rows, widths).header(header).block(block), area);
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, title: String, lines: &[ChartLine]) {
    let block = Block::default()
        .title(Span::styled(title, HEADER_STYLE))
        .borders(Borders::ALL);
    let points = lines.iter().flat_map(|(_, _, pts)| pts.iter());
    let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) =
        (f64::INFINITY, f64::NEG_INFINITY, 0.0_f64, f64::NEG_INFINITY);
    for &(x, y) in points {
        x_lo = x_lo.min(x);
        x_hi = x_hi.max(x);
        y_lo = y_lo.min(y);
        y_hi = y_hi.max(y);
    }
    if !x_lo.is_finite() {
        frame.render_widget(
            Paragraph::new("No data for this selection.").block(block),
            area,
        );
        return;
    }
    if x_hi <= x_lo {
        x_hi = x_lo + 1.0;
    }
    y_hi = if y_hi > y_lo { y_hi * 1.05 } else { y_lo + 1.0 };

    let datasets: Vec<Dataset> = lines
        .iter()
        .map(|(name, color, pts)| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(pts)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(FOOTER_STYLE)
                .bounds([x_lo, x_hi])
                .labels(vec![
                    Span::raw(month_label(x_lo)),
                    Span::raw(month_label((x_lo + x_hi) / 2.0)),
                    Span::raw(month_label(x_hi)),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(FOOTER_STYLE)
                .bounds([y_lo, y_hi])
                .labels(vec![
                    Span::raw(compact(y_lo)),
                    Span::raw(compact((y_lo + y_hi) / 2.0)),
                    Span::raw(compact(y_hi)),
                ]),
        );
    frame.render_widget(chart, area);
}

impl Screen for Dashboard<'_> {
    fn draw(&mut self, frame: &mut Frame) {
        let [title_area, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        let [options_area, right] =
            Layout::horizontal([Constraint::Length(30), Constraint::Min(0)]).areas(body);
        let [abs_area, rel_area, table_area] = Layout::vertical([
            Constraint::Percentage(38),
            Constraint::Percentage(38),
            Constraint::Min(5),
        ])
        .areas(right);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(TITLE, HEADER_STYLE),
                Span::raw(format!(
                    "   Miesiąc: {} .. {}",
                    self.start.format("%Y-%m"),
                    self.end.format("%Y-%m")
                )),
            ])),
            title_area,
        );

        self.draw_options(frame, options_area);

        let title = self.breakdown.title();
        match &self.view {
            Some(view) => {
                let (absolute, relative) = self.chart_lines(view);
                draw_chart(frame, abs_area, title.to_string(), &absolute);
                let basis = view
                    .basis_label()
                    .unwrap_or_else(|| "pierwszego miesiąca".to_string());
                let mut rel_title = format!("{title} - wartość w stosunku do {basis}");
                let undefined: Vec<String> = view
                    .series
                    .iter()
                    .filter(|s| s.result.is_err())
                    .map(|s| s.series.to_string())
                    .collect();
                if !undefined.is_empty() {
                    rel_title.push_str(&format!(" (brak bazy: {})", undefined.join(", ")));
                }
                draw_chart(frame, rel_area, rel_title, &relative);
            }
            None => {
                draw_chart(frame, abs_area, title.to_string(), &[]);
                draw_chart(frame, rel_area, title.to_string(), &[]);
            }
        }

        self.draw_listing(frame, table_area);

        let footer_line = match &self.error {
            Some(e) => Line::from(Span::styled(e.clone(), WARNING_STYLE)),
            None => Line::from(Span::styled(KEYS, FOOTER_STYLE)),
        };
        frame.render_widget(Paragraph::new(footer_line), footer);
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ScreenAction::Close,
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                return ScreenAction::Continue;
            }
            KeyCode::Down => {
                self.cursor = (self.cursor + 1).min(self.options.len().saturating_sub(1));
                return ScreenAction::Continue;
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_current(),
            KeyCode::Char('a') => self.toggle_all(),
            KeyCode::Tab => self.switch_breakdown(),
            KeyCode::Char('[') => self.start = self.clamp(shift_months(self.start, -1)),
            KeyCode::Char(']') => self.start = self.clamp(shift_months(self.start, 1)),
            KeyCode::Char('{') => self.end = self.clamp(shift_months(self.end, -1)),
            KeyCode::Char('}') => self.end = self.clamp(shift_months(self.end, 1)),
            _ => return ScreenAction::Continue,
        }
        self.recompute();
        ScreenAction::Continue
    }
}

pub fn run(data_dir: Option<&str>, demo_latency: Option<u64>) -> Result<()> {
    let ctx = super::load_context(data_dir)?;
    let mut dashboard = Dashboard::new(&ctx, demo_latency.map(Duration::from_millis))?;
    run_screen(&mut dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::context;
    use ratatui::{backend::TestBackend, Terminal};

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn render(dashboard: &mut Dashboard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| dashboard.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_starts_with_everything_selected() {
        let ctx = context();
        let dash = Dashboard::new(&ctx, None).unwrap();
        assert_eq!(dash.gender_selected.len(), 3);
        assert_eq!(dash.region_selected.len(), 2);
        assert_eq!((dash.start, dash.end), (d(2017, 1), d(2017, 2)));
        assert!(!dash.view.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_recomputes_series() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        // cursor 0 is "kobiety"
        dash.handle_key(KeyCode::Char(' '));
        assert!(!dash.gender_selected.contains("kobiety"));
        let view = dash.view.as_ref().unwrap();
        assert!(view.points().iter().all(|p| p.series != Value::from("kobiety")));
        assert!(dash
            .listing
            .as_ref()
            .unwrap()
            .column("Płeć")
            .unwrap()
            .all(|v| *v != Value::from("kobiety")));
    }

    #[test]
    fn test_select_none_renders_no_data() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        dash.handle_key(KeyCode::Char('a'));
        assert!(dash.gender_selected.is_empty());
        assert!(dash.view.as_ref().unwrap().is_empty());
        assert!(render(&mut dash).contains("No data for this selection."));
        dash.handle_key(KeyCode::Char('a'));
        assert_eq!(dash.gender_selected.len(), 3);
    }

    #[test]
    fn test_tab_switches_breakdown_and_keeps_selections() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        dash.handle_key(KeyCode::Char(' '));
        dash.handle_key(KeyCode::Tab);
        assert_eq!(dash.breakdown, Breakdown::Region);
        assert_eq!(dash.options, vec!["MAZOWIECKIE", "OPOLSKIE"]);
        assert_eq!(dash.gender_selected.len(), 2);
        let view = dash.view.as_ref().unwrap();
        assert_eq!(view.breakdown, Breakdown::Region);
        assert!(view.series.iter().any(|s| s.result.is_err()));
        assert!(render(&mut dash).contains("brak bazy: OPOLSKIE"));
    }

    #[test]
    fn test_range_keys_clamp_and_move_baseline() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        dash.handle_key(KeyCode::Char('['));
        assert_eq!(dash.start, d(2017, 1));
        dash.handle_key(KeyCode::Char(']'));
        assert_eq!(dash.start, d(2017, 2));
        let view = dash.view.as_ref().unwrap();
        assert_eq!(view.basis_label().as_deref(), Some("2017-2"));
        dash.handle_key(KeyCode::Char('}'));
        assert_eq!(dash.end, d(2017, 2));
        dash.handle_key(KeyCode::Char('{'));
        assert_eq!(dash.end, d(2017, 1));
        assert!(dash.view.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_cursor_and_quit() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        for _ in 0..10 {
            dash.handle_key(KeyCode::Down);
        }
        assert_eq!(dash.cursor, 2);
        assert!(matches!(dash.handle_key(KeyCode::Char('q')), ScreenAction::Close));
    }

    #[test]
    fn test_renders_titles() {
        let ctx = context();
        let mut dash = Dashboard::new(&ctx, None).unwrap();
        let screen = render(&mut dash);
        assert!(screen.contains("Bezrobocie według płci"));
        assert!(screen.contains("2017-1"));
    }

    #[test]
    fn test_month_label_roundtrip() {
        let x = month_index(&Value::Date(d(2019, 12))).unwrap();
        assert_eq!(month_label(x), "2019-12");
    }
}
