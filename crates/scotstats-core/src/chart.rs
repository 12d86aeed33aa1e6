//! Multi-panel summary figure.
//!
//! One line panel per metric, a decade bar panel for births and one scatter
//! panel per correlation. Two metrics give the familiar 2x2 grid; adding CPI
//! grows it to 3x2. Every panel falls back to a unit axis range when its
//! data is empty so rendering never fails on missing overlap.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::report::{AnalysisReport, Correlation};
use crate::types::{Metric, TimeSeries, YearRange};

const PANEL_WIDTH: u32 = 750;
const PANEL_HEIGHT: u32 = 560;
const TITLE_HEIGHT: u32 = 60;
const FONT: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

static FONT_REGISTRATION: OnceLock<std::result::Result<(), String>> = OnceLock::new();

const ORANGE: RGBColor = RGBColor(230, 126, 34);
const PURPLE: RGBColor = RGBColor(128, 0, 128);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    /// `.svg` selects vector output; anything else is written as PNG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartFormat::Svg,
            _ => ChartFormat::Png,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Panel<'a> {
    Line {
        title: String,
        metric: Metric,
        points: Vec<(i32, f64)>,
    },
    Decades {
        title: String,
        metric: Metric,
        means: &'a BTreeMap<i32, f64>,
    },
    Scatter {
        title: String,
        correlation: &'a Correlation,
    },
}

fn line_title(metric: Metric, range: YearRange) -> String {
    match metric {
        Metric::Births => format!("Annual Births in Scotland ({range})"),
        Metric::UnemploymentRate => format!("Average Annual Unemployment Rate ({range})"),
        Metric::Cpi => format!("Average Annual CPI ({range})"),
    }
}

fn short_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Births => "Births",
        Metric::UnemploymentRate => "Unemployment Rate",
        Metric::Cpi => "CPI",
    }
}

fn color(metric: Metric) -> RGBColor {
    match metric {
        Metric::Births => BLUE,
        Metric::UnemploymentRate => RED,
        Metric::Cpi => ORANGE,
    }
}

/// Lays out the panels for `series`, which must already be restricted to the
/// report's range and reduced to yearly values.
pub fn plan<'a>(report: &'a AnalysisReport, series: &[TimeSeries]) -> Vec<Panel<'a>> {
    let mut panels: Vec<Panel<'a>> = series
        .iter()
        .map(|s| Panel::Line {
            title: line_title(s.metric, report.year_range),
            metric: s.metric,
            points: s.points.iter().map(|p| (p.year(), p.value)).collect(),
        })
        .collect();

    let decades = report
        .metric(Metric::Births)
        .or_else(|| report.metrics.first());
    if let Some(decades) = decades {
        panels.push(Panel::Decades {
            title: format!("Average Annual {} by Decade", short_name(decades.metric)),
            metric: decades.metric,
            means: &decades.decades,
        });
    }

    panels.extend(report.correlations.iter().map(|correlation| Panel::Scatter {
        title: format!(
            "{} vs {}",
            short_name(correlation.y),
            short_name(correlation.x)
        ),
        correlation,
    }));
    panels
}

/// Text is rasterized from the bundled face, so output does not depend on
/// system fonts.
fn ensure_font() -> Result<()> {
    FONT_REGISTRATION
        .get_or_init(|| {
            register_font(FONT, FontStyle::Normal, FONT_BYTES)
                .map_err(|_| "bundled font is invalid".to_string())
        })
        .clone()
        .map_err(PipelineError::Chart)
}

pub fn render_chart(report: &AnalysisReport, series: &[TimeSeries], path: &Path) -> Result<()> {
    ensure_font()?;
    let panels = plan(report, series);
    let rows = panels.len().div_ceil(2).max(1);
    let size = (PANEL_WIDTH * 2, PANEL_HEIGHT * rows as u32 + TITLE_HEIGHT);
    let title = format!(
        "Economic and Demographic Analysis: Scotland {}",
        report.year_range
    );
    let format = ChartFormat::from_path(path);

    match format {
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_figure(root, &title, &panels, rows, report.year_range).map_err(chart_error)?;
        }
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_figure(root, &title, &panels, rows, report.year_range).map_err(chart_error)?;
        }
    }

    info!(
        path = %path.display(),
        format = ?format,
        panels = panels.len(),
        "Chart written"
    );
    Ok(())
}

fn chart_error<E>(err: DrawingAreaErrorKind<E>) -> PipelineError
where
    E: std::error::Error + Send + Sync,
{
    PipelineError::Chart(err.to_string())
}

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

fn draw_figure<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    panels: &[Panel<'_>],
    rows: usize,
    range: YearRange,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let body = root.titled(title, (FONT, 30))?;
    let cells = body.split_evenly((rows, 2));
    for (panel, cell) in panels.iter().zip(cells.iter()) {
        match panel {
            Panel::Line {
                title,
                metric,
                points,
            } => draw_line(cell, title, *metric, points, range)?,
            Panel::Decades {
                title,
                metric,
                means,
            } => draw_decades(cell, title, *metric, means, range)?,
            Panel::Scatter { title, correlation } => draw_scatter(cell, title, correlation)?,
        }
    }
    root.present()?;
    Ok(())
}

/// Padded bounds of `values`, or `0..1` when there are none.
fn value_bounds(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 0.5)..(max + 0.5);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

fn year_bounds(years: impl IntoIterator<Item = i32>, fallback: YearRange) -> Range<i32> {
    let years: Vec<i32> = years.into_iter().collect();
    match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => *min..(*max + 1),
        _ => fallback.start..(fallback.end + 1),
    }
}

fn draw_line<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    metric: Metric,
    points: &[(i32, f64)],
    range: YearRange,
) -> DrawResult<DB> {
    let x_range = year_bounds(points.iter().map(|(year, _)| *year), range);
    let y_range = value_bounds(points.iter().map(|(_, value)| *value));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(metric.label())
        .draw()?;
    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        color(metric).stroke_width(2),
    ))?;
    Ok(())
}

fn draw_decades<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    metric: Metric,
    means: &BTreeMap<i32, f64>,
    range: YearRange,
) -> DrawResult<DB> {
    let x_range = match (means.keys().next(), means.keys().next_back()) {
        (Some(first), Some(last)) => *first..(*last + 10),
        _ => range.start..(range.end + 1),
    };
    let top = means.values().copied().fold(0.0_f64, f64::max);
    let y_range = 0.0..if top > 0.0 { top * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc("Decade")
        .y_desc(format!("Average {}", metric.label()))
        .draw()?;
    chart.draw_series(means.iter().map(|(decade, mean)| {
        Rectangle::new([(*decade + 1, 0.0), (*decade + 9, *mean)], GREEN.mix(0.7).filled())
    }))?;
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    correlation: &Correlation,
) -> DrawResult<DB> {
    let points = &correlation.points;
    let x_range = value_bounds(points.iter().map(|(x, _)| *x));
    let y_range = value_bounds(points.iter().map(|(_, y)| *y));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(correlation.x.label())
        .y_desc(correlation.y.label())
        .draw()?;
    chart.draw_series(
        points
            .iter()
            .map(|point| Circle::new(*point, 4, PURPLE.mix(0.6).filled())),
    )?;

    let (width, height) = area.dim_in_pixel();
    let caption = match correlation.coefficient {
        Some(r) => Text::new(format!("Correlation: {r:.3}"), (100, 50), (FONT, 18)),
        None => Text::new(
            "Insufficient overlapping data for correlation analysis".to_string(),
            (width as i32 / 5, height as i32 / 2),
            (FONT, 18),
        ),
    };
    area.draw(&caption)?;
    Ok(())
}
