use std::collections::BTreeMap;

use polars::prelude::*;

use crate::types::{year_start, Frequency, Metric, Observation, TimeSeries, YearRange};

impl TimeSeries {
    /// Keeps points whose year falls inside the closed range.
    pub fn restrict(&self, range: YearRange) -> TimeSeries {
        let points = self
            .points
            .iter()
            .copied()
            .filter(|point| range.contains(point.year()))
            .collect();
        TimeSeries::new(self.metric, self.frequency, points)
    }

    /// One arithmetic mean per calendar year, years ascending.
    pub fn yearly_mean(&self) -> TimeSeries {
        let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for point in &self.points {
            let entry = sums.entry(point.year()).or_insert((0.0, 0));
            entry.0 += point.value;
            entry.1 += 1;
        }

        let points = sums
            .into_iter()
            .filter_map(|(year, (sum, count))| {
                year_start(year).map(|date| Observation::new(date, sum / count as f64))
            })
            .collect();
        TimeSeries::new(self.metric, Frequency::Annual, points)
    }

    /// The series as used for reporting: restricted to `range` and, when
    /// sub-annual, reduced to yearly means.
    pub fn for_reporting(&self, range: YearRange) -> TimeSeries {
        let restricted = self.restrict(range);
        match restricted.frequency {
            Frequency::Annual => restricted,
            Frequency::SubAnnual => restricted.yearly_mean(),
        }
    }
}

/// Concatenates series of one metric. A lone non-empty part keeps its row
/// order untouched; several releases (e.g. historical and current CPI) are
/// merged by date, equal dates keeping their input order.
pub fn concat_series(metric: Metric, parts: &[TimeSeries]) -> TimeSeries {
    let frequency = if parts
        .iter()
        .any(|part| part.frequency == Frequency::SubAnnual)
    {
        Frequency::SubAnnual
    } else {
        Frequency::Annual
    };

    let mut points: Vec<Observation> = parts
        .iter()
        .flat_map(|part| part.points.iter().copied())
        .collect();
    let populated = parts.iter().filter(|part| !part.is_empty()).count();
    if populated > 1 {
        points.sort_by_key(|point| point.date);
    }
    TimeSeries::new(metric, frequency, points)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub year: i32,
    /// One value per metric, in `AlignedDataset::metrics` order.
    pub values: Vec<f64>,
}

/// Inner join of several series on year.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDataset {
    pub metrics: Vec<Metric>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|row| row.year).collect()
    }

    pub fn column(&self, metric: Metric) -> Option<Vec<f64>> {
        let idx = self.metrics.iter().position(|m| *m == metric)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.metrics.len() + 1);
        columns.push(Series::new("Year".into(), self.years()).into());
        for (idx, metric) in self.metrics.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|row| row.values[idx]).collect();
            columns.push(Series::new(metric.canonical_name().into(), values).into());
        }
        DataFrame::new(columns)
    }
}

/// Restricts every series to `range`, reduces sub-annual series to yearly
/// means and inner-joins on year.
///
/// Rows follow the first series' order. A year repeated within an annual
/// input yields one row per matching combination, like a relational join.
/// Disjoint inputs give an empty dataset.
pub fn align(series: &[&TimeSeries], range: YearRange) -> AlignedDataset {
    let metrics: Vec<Metric> = series.iter().map(|s| s.metric).collect();
    let prepared: Vec<TimeSeries> = series.iter().map(|s| s.for_reporting(range)).collect();

    let Some((first, rest)) = prepared.split_first() else {
        return AlignedDataset {
            metrics,
            rows: Vec::new(),
        };
    };

    let lookups: Vec<BTreeMap<i32, Vec<f64>>> = rest
        .iter()
        .map(|s| {
            let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
            for point in &s.points {
                by_year.entry(point.year()).or_default().push(point.value);
            }
            by_year
        })
        .collect();

    let mut rows = Vec::new();
    for point in &first.points {
        let year = point.year();
        let mut combos: Vec<Vec<f64>> = vec![vec![point.value]];
        for lookup in &lookups {
            let Some(matches) = lookup.get(&year) else {
                combos.clear();
                break;
            };
            combos = combos
                .iter()
                .flat_map(|prefix| {
                    matches.iter().map(move |value| {
                        let mut row = prefix.clone();
                        row.push(*value);
                        row
                    })
                })
                .collect();
        }
        rows.extend(combos.into_iter().map(|values| AlignedRow { year, values }));
    }

    AlignedDataset { metrics, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(metric: Metric, values: &[(i32, u32, f64)]) -> TimeSeries {
        let points = values
            .iter()
            .map(|(y, m, v)| Observation::new(NaiveDate::from_ymd_opt(*y, *m, 1).unwrap(), *v))
            .collect();
        TimeSeries::new(metric, Frequency::SubAnnual, points)
    }

    #[test]
    fn restrict_keeps_closed_range() {
        let series = TimeSeries::annual(Metric::Births, [(1970, 1.0), (1971, 2.0), (2023, 3.0), (2024, 4.0)]);
        let restricted = series.restrict(YearRange::new(1971, 2023));
        assert_eq!(restricted.years(), vec![1971, 2023]);
    }

    #[test]
    fn yearly_mean_averages_sub_annual_points() {
        let series = monthly(
            Metric::UnemploymentRate,
            &[(1972, 1, 5.5), (1971, 1, 3.0), (1971, 4, 5.0), (1972, 2, 6.5)],
        );
        let yearly = series.yearly_mean();
        assert_eq!(yearly.frequency, Frequency::Annual);
        assert_eq!(yearly.years(), vec![1971, 1972]);
        assert_eq!(yearly.values(), vec![4.0, 6.0]);
    }

    #[test]
    fn disjoint_ranges_align_to_empty() {
        let a = TimeSeries::annual(Metric::Births, [(1971, 1.0), (1972, 2.0)]);
        let b = TimeSeries::annual(Metric::UnemploymentRate, [(1980, 1.0), (1981, 2.0)]);
        let aligned = align(&[&a, &b], YearRange::new(1900, 2100));
        assert!(aligned.is_empty());
        assert_eq!(aligned.metrics, vec![Metric::Births, Metric::UnemploymentRate]);
        assert_eq!(aligned.column(Metric::Births), Some(Vec::new()));
        assert_eq!(aligned.to_frame().unwrap().height(), 0);
    }

    #[test]
    fn joins_on_year_after_aggregating_monthly_series() {
        let births = TimeSeries::annual(Metric::Births, [(1973, 30.0), (1971, 10.0), (1972, 20.0)]);
        let rate = monthly(
            Metric::UnemploymentRate,
            &[(1971, 1, 2.0), (1971, 2, 4.0), (1973, 1, 5.0), (1974, 1, 9.0)],
        );
        let aligned = align(&[&births, &rate], YearRange::new(1971, 2023));

        assert_eq!(aligned.years(), vec![1973, 1971]);
        assert_eq!(aligned.column(Metric::Births), Some(vec![30.0, 10.0]));
        assert_eq!(aligned.column(Metric::UnemploymentRate), Some(vec![5.0, 3.0]));
        assert_eq!(aligned.column(Metric::Cpi), None);

        let frame = aligned.to_frame().unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.column("Births").unwrap().f64().unwrap().get(1), Some(10.0));
    }

    #[test]
    fn duplicate_annual_years_produce_every_combination() {
        let births = TimeSeries::annual(Metric::Births, [(1971, 1.0), (1971, 2.0)]);
        let cpi = TimeSeries::annual(Metric::Cpi, [(1971, 7.0)]);
        let aligned = align(&[&births, &cpi], YearRange::default());
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.rows[1].values, vec![2.0, 7.0]);
    }

    #[test]
    fn range_restriction_applies_before_the_join() {
        let a = TimeSeries::annual(Metric::Births, [(1970, 1.0), (1971, 2.0)]);
        let b = TimeSeries::annual(Metric::Cpi, [(1970, 3.0), (1971, 4.0)]);
        let aligned = align(&[&a, &b], YearRange::new(1971, 1971));
        assert_eq!(aligned.years(), vec![1971]);
    }

    #[test]
    fn concat_merges_releases_by_date_and_keeps_sub_annual_frequency() {
        let current = monthly(Metric::Cpi, &[(1989, 1, 50.0)]);
        let historical = monthly(Metric::Cpi, &[(1988, 2, 48.0), (1988, 1, 47.0)]);
        let merged = concat_series(Metric::Cpi, &[current, historical]);
        assert_eq!(merged.values(), vec![47.0, 48.0, 50.0]);
        assert_eq!(merged.frequency, Frequency::SubAnnual);
    }

    #[test]
    fn concat_of_one_release_keeps_row_order() {
        let births = TimeSeries::annual(Metric::Births, [(1975, 3.0), (1973, 2.0), (1974, 1.0)]);
        let empty = TimeSeries::annual(Metric::Births, Vec::<(i32, f64)>::new());
        let merged = concat_series(Metric::Births, &[empty, births]);
        assert_eq!(merged.years(), vec![1975, 1973, 1974]);
        assert_eq!(merged.frequency, Frequency::Annual);
    }
}
