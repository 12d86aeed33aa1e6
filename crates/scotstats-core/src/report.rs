use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use comfy_table::{presets, Table};

use crate::alignment::{align, AlignedDataset};
use crate::stats::{decade_means, pearson, summarize, trend, SeriesSummary, Trend};
use crate::types::{Metric, TimeSeries, YearRange};

const RULE_WIDTH: usize = 50;

/// What one configured source contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub name: String,
    pub metric: Metric,
    pub tables: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
}

/// Everything the report says about one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReport {
    pub metric: Metric,
    /// Observations inside the year range before yearly aggregation.
    pub records: usize,
    pub span: Option<(NaiveDate, NaiveDate)>,
    /// Computed on the reporting series (yearly means for sub-annual data).
    pub summary: Option<SeriesSummary>,
    pub trend: Option<Trend>,
    pub decades: BTreeMap<i32, f64>,
}

/// Pearson correlation between two columns of an aligned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    /// Plotted on the horizontal axis.
    pub x: Metric,
    pub y: Metric,
    pub years: Vec<i32>,
    /// `(x, y)` pairs in aligned row order.
    pub points: Vec<(f64, f64)>,
    pub coefficient: Option<f64>,
}

impl Correlation {
    pub fn from_aligned(aligned: &AlignedDataset, x: Metric, y: Metric) -> Self {
        let (xs, ys) = match (aligned.column(x), aligned.column(y)) {
            (Some(xs), Some(ys)) => (xs, ys),
            _ => (Vec::new(), Vec::new()),
        };
        let coefficient = pearson(&xs, &ys);
        let years = if xs.is_empty() { Vec::new() } else { aligned.years() };
        Self {
            x,
            y,
            years,
            points: xs.into_iter().zip(ys).collect(),
            coefficient,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub year_range: YearRange,
    pub sources: Vec<SourceSummary>,
    pub metrics: Vec<MetricReport>,
    pub correlations: Vec<Correlation>,
}

impl AnalysisReport {
    /// `series` holds one merged series per metric, not yet restricted to the
    /// year range. `aligned` is their year join; correlations are read off
    /// its columns. Births, when present, is correlated against every other
    /// metric; otherwise the first aligned metric is.
    pub fn build(
        year_range: YearRange,
        sources: Vec<SourceSummary>,
        series: &[TimeSeries],
        aligned: &AlignedDataset,
    ) -> Self {
        let metrics = series
            .iter()
            .map(|s| {
                let restricted = s.restrict(year_range);
                let reporting = s.for_reporting(year_range);
                MetricReport {
                    metric: s.metric,
                    records: restricted.len(),
                    span: restricted.span(),
                    summary: summarize(&reporting),
                    trend: trend(&reporting.values()),
                    decades: decade_means(&reporting),
                }
            })
            .collect();

        let anchor = aligned
            .metrics
            .iter()
            .copied()
            .find(|metric| *metric == Metric::Births)
            .or_else(|| aligned.metrics.first().copied());
        let correlations = match anchor {
            Some(anchor) => aligned
                .metrics
                .iter()
                .filter(|metric| **metric != anchor)
                .map(|other| Correlation::from_aligned(aligned, *other, anchor))
                .collect(),
            None => Vec::new(),
        };

        Self {
            year_range,
            sources,
            metrics,
            correlations,
        }
    }

    /// Aligns `series` over `year_range` and builds the report from that join.
    pub fn from_series(
        year_range: YearRange,
        sources: Vec<SourceSummary>,
        series: &[TimeSeries],
    ) -> Self {
        let refs: Vec<&TimeSeries> = series.iter().collect();
        let aligned = align(&refs, year_range);
        Self::build(year_range, sources, series, &aligned)
    }

    pub fn metric(&self, metric: Metric) -> Option<&MetricReport> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    pub fn correlation(&self, x: Metric) -> Option<&Correlation> {
        self.correlations.iter().find(|c| c.x == x)
    }

    fn decade_table(&self) -> Option<Table> {
        let mut decades: Vec<i32> = self
            .metrics
            .iter()
            .flat_map(|m| m.decades.keys().copied())
            .collect();
        decades.sort_unstable();
        decades.dedup();
        if decades.is_empty() {
            return None;
        }

        let mut table = Table::new();
        table.load_preset(presets::ASCII_MARKDOWN);
        let mut header = vec!["Decade".to_string()];
        header.extend(self.metrics.iter().map(|m| m.metric.canonical_name().to_string()));
        table.set_header(header);

        for decade in decades {
            let mut row = vec![format!("{decade}s")];
            for report in &self.metrics {
                let cell = match report.decades.get(&decade) {
                    Some(mean) => report.metric.format_value(*mean),
                    None => "-".to_string(),
                };
                row.push(cell);
            }
            table.add_row(row);
        }
        Some(table)
    }
}

pub fn render_text(report: &AnalysisReport) -> String {
    report.to_string()
}

fn heading(metric: Metric) -> &'static str {
    match metric {
        Metric::Births => "BIRTHS",
        Metric::UnemploymentRate => "UNEMPLOYMENT",
        Metric::Cpi => "CPI",
    }
}

fn trend_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Births => "Births",
        Metric::UnemploymentRate => "Unemployment",
        Metric::Cpi => "CPI",
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, summary: &SeriesSummary) -> fmt::Result {
    let metric = summary.metric;
    match metric {
        Metric::Births => {
            writeln!(f, "Total births: {}", metric.format_value(summary.sum))?;
            writeln!(f, "Average annual births: {:.0}", summary.mean)?;
            writeln!(
                f,
                "Highest year: {} ({} births)",
                summary.max.date.year(),
                metric.format_value(summary.max.value)
            )?;
            writeln!(
                f,
                "Lowest year: {} ({} births)",
                summary.min.date.year(),
                metric.format_value(summary.min.value)
            )
        }
        Metric::UnemploymentRate => {
            writeln!(f, "Average unemployment rate: {}", metric.format_value(summary.mean))?;
            writeln!(
                f,
                "Highest unemployment: {} ({})",
                metric.format_value(summary.max.value),
                summary.max.date.year()
            )?;
            writeln!(
                f,
                "Lowest unemployment: {} ({})",
                metric.format_value(summary.min.value),
                summary.min.date.year()
            )
        }
        Metric::Cpi => {
            writeln!(f, "Average CPI: {}", metric.format_value(summary.mean))?;
            writeln!(
                f,
                "Highest CPI: {} ({})",
                metric.format_value(summary.max.value),
                summary.max.date.year()
            )?;
            writeln!(
                f,
                "Lowest CPI: {} ({})",
                metric.format_value(summary.min.value),
                summary.min.date.year()
            )
        }
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = self.year_range;
        let rule = "=".repeat(RULE_WIDTH);

        for report in &self.metrics {
            match report.span {
                Some((first, last)) => writeln!(
                    f,
                    "{} data: {} records from {} to {}",
                    report.metric, report.records, first, last
                )?,
                None => writeln!(f, "{} data: 0 records (no data in {range})", report.metric)?,
            }
        }

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "SUMMARY STATISTICS")?;
        writeln!(f, "{rule}")?;

        for report in &self.metrics {
            writeln!(f)?;
            writeln!(f, "{} DATA ({range}):", heading(report.metric))?;
            match &report.summary {
                Some(summary) => write_summary(f, summary)?,
                None => writeln!(f, "No data in {range}")?,
            }
        }

        writeln!(f)?;
        writeln!(f, "AVERAGE BY DECADE:")?;
        match self.decade_table() {
            Some(table) => writeln!(f, "{table}")?,
            None => writeln!(f, "No data in {range}")?,
        }

        writeln!(f)?;
        writeln!(f, "TREND ANALYSIS:")?;
        for report in &self.metrics {
            let label = trend_label(report.metric);
            match report.trend {
                Some(trend) => writeln!(
                    f,
                    "{label} trend: {} by {} per year",
                    trend.direction,
                    report.metric.format_rate(trend.slope.abs())
                )?,
                None => writeln!(f, "{label} trend: insufficient data")?,
            }
        }

        if !self.correlations.is_empty() {
            writeln!(f)?;
            writeln!(f, "CORRELATION:")?;
        }
        for correlation in &self.correlations {
            let pair = format!("{} vs {}", correlation.y, correlation.x);
            match correlation.coefficient {
                Some(r) => writeln!(
                    f,
                    "{pair}: {r:.3} ({} overlapping years)",
                    correlation.len()
                )?,
                None => writeln!(
                    f,
                    "{pair}: Insufficient overlapping data for correlation analysis"
                )?,
            }
        }

        Ok(())
    }
}
