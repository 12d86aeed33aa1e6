use polars::prelude::*;
use scotstats_parser::RawTable;

use crate::config::{ColumnSelector, SourceConfig};
use crate::dates::{parse_date, DateFormat};
use crate::error::{PipelineError, Result};
use crate::types::{Frequency, Metric, Observation, TimeSeries};

/// How one raw table should be turned into a series.
#[derive(Debug, Clone)]
pub struct NormalizeRules<'a> {
    pub metric: Metric,
    pub date: &'a ColumnSelector,
    pub value: &'a ColumnSelector,
    pub skip_data_rows: usize,
    pub date_format: DateFormat,
    pub frequency: Frequency,
}

impl<'a> From<&'a SourceConfig> for NormalizeRules<'a> {
    fn from(source: &'a SourceConfig) -> Self {
        Self {
            metric: source.metric,
            date: &source.columns.date,
            value: &source.columns.value,
            skip_data_rows: source.skip_data_rows,
            date_format: source.date_format,
            frequency: source.frequency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub series: TimeSeries,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// Strips grouping commas and surrounding whitespace, then parses. Anything
/// left over that is not a finite number yields `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let value = cleaned.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn resolve_column<'t>(
    table: &'t RawTable,
    selector: &ColumnSelector,
) -> Result<&'t StringChunked> {
    let column = match selector {
        ColumnSelector::Named(name) => table.df.column(name).ok(),
        ColumnSelector::Position(idx) => table.df.get_columns().get(*idx),
    };

    let column = column.ok_or_else(|| PipelineError::MissingColumn {
        table: table.label(),
        column: selector.to_string(),
        header: table.header(),
    })?;

    Ok(column.str()?)
}

/// Maps a raw table onto `(Date, metric)` and drops rows whose date or value
/// fails coercion. Row order is preserved and nothing is deduplicated.
pub fn normalize_table(table: &RawTable, rules: &NormalizeRules<'_>) -> Result<Normalized> {
    // Blank sheets come back with no columns at all.
    if table.width() == 0 {
        return Ok(Normalized {
            series: TimeSeries::new(rules.metric, rules.frequency, Vec::new()),
            rows_read: 0,
            rows_dropped: 0,
        });
    }

    let dates = resolve_column(table, rules.date)?;
    let values = resolve_column(table, rules.value)?;

    let height = table.height();
    let start = rules.skip_data_rows.min(height);
    let rows_read = height - start;

    let mut points = Vec::with_capacity(rows_read);
    for idx in start..height {
        let (Some(raw_date), Some(raw_value)) = (dates.get(idx), values.get(idx)) else {
            continue;
        };
        let Some(date) = parse_date(raw_date, rules.date_format) else {
            continue;
        };
        let Some(value) = parse_value(raw_value) else {
            continue;
        };
        points.push(Observation::new(date, value));
    }

    let rows_dropped = rows_read - points.len();
    Ok(Normalized {
        series: TimeSeries::new(rules.metric, rules.frequency, points),
        rows_read,
        rows_dropped,
    })
}
