use std::fmt;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Births,
    UnemploymentRate,
    Cpi,
}

impl Metric {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Metric::Births => "Births",
            Metric::UnemploymentRate => "Unemployment_Rate",
            Metric::Cpi => "CPI",
        }
    }

    /// Axis label used by the chart.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Births => "Number of Births",
            Metric::UnemploymentRate => "Unemployment Rate (%)",
            Metric::Cpi => "CPI (index)",
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::Births => group_thousands(value),
            Metric::UnemploymentRate => format!("{value:.1}%"),
            Metric::Cpi => format!("{value:.1}"),
        }
    }

    /// Per-year change as printed in the trend section.
    pub fn format_rate(&self, slope: f64) -> String {
        match self {
            Metric::Births => format!("{} births", group_thousands(slope)),
            Metric::UnemploymentRate => format!("{slope:.2}%"),
            Metric::Cpi => format!("{slope:.2} index points"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Rounds to a whole number and inserts `,` every three digits.
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Annual,
    /// Monthly, quarterly or mixed observations; reduced to yearly means
    /// before alignment.
    SubAnnual,
}

/// Closed range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(1971, 2023)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// January 1st of `year`; `None` outside chrono's supported range.
pub fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub metric: Metric,
    pub frequency: Frequency,
    pub points: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(metric: Metric, frequency: Frequency, points: Vec<Observation>) -> Self {
        Self {
            metric,
            frequency,
            points,
        }
    }

    /// Builds an annual series from `(year, value)` pairs in the given order.
    pub fn annual<I>(metric: Metric, values: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let points = values
            .into_iter()
            .filter_map(|(year, value)| year_start(year).map(|date| Observation::new(date, value)))
            .collect();
        Self::new(metric, Frequency::Annual, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(Observation::year).collect()
    }

    /// Earliest and latest dates present.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.points.iter().map(|p| p.date).min()?;
        let last = self.points.iter().map(|p| p.date).max()?;
        Some((first, last))
    }

    /// Number of points whose year already appeared earlier in the series.
    pub fn duplicate_years(&self) -> usize {
        let mut years = self.years();
        let total = years.len();
        years.sort_unstable();
        years.dedup();
        total - years.len()
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let epoch = chrono::DateTime::UNIX_EPOCH.date_naive();
        let days: Vec<i32> = self
            .points
            .iter()
            .map(|p| (p.date - epoch).num_days() as i32)
            .collect();
        let date = Series::new("Date".into(), days).cast(&DataType::Date)?;
        let values = Series::new(self.metric.canonical_name().into(), self.values());
        DataFrame::new(vec![date.into(), values.into()])
    }
}
