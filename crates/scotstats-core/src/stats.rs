use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::types::{Metric, Observation, TimeSeries};

/// A maximum or minimum together with the date it was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extreme {
    pub date: NaiveDate,
    pub value: f64,
}

impl From<&Observation> for Extreme {
    fn from(point: &Observation) -> Self {
        Self {
            date: point.date,
            value: point.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub metric: Metric,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub max: Extreme,
    pub min: Extreme,
}

/// Count, sum, mean and extremes. Ties for max/min resolve to the first
/// occurrence. `None` for an empty series.
pub fn summarize(series: &TimeSeries) -> Option<SeriesSummary> {
    let (first, rest) = series.points.split_first()?;

    let mut sum = first.value;
    let mut max = first;
    let mut min = first;
    for point in rest {
        sum += point.value;
        if point.value > max.value {
            max = point;
        }
        if point.value < min.value {
            min = point;
        }
    }

    let count = series.len();
    Some(SeriesSummary {
        metric: series.metric,
        count,
        sum,
        mean: sum / count as f64,
        max: max.into(),
        min: min.into(),
    })
}

/// Start year of the decade containing `year`, using floor division.
pub fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// Mean value per decade, keyed by decade start year.
pub fn decade_means(series: &TimeSeries) -> BTreeMap<i32, f64> {
    let mut buckets: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for point in &series.points {
        let bucket = buckets.entry(decade_of(point.year())).or_insert((0.0, 0));
        bucket.0 += point.value;
        bucket.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(decade, (sum, count))| (decade, sum / count as f64))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => f.write_str("Increasing"),
            TrendDirection::Decreasing => f.write_str("Decreasing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub direction: TrendDirection,
}

/// Least-squares slope of `values` against their index (0, 1, 2, ...).
///
/// Only a strictly positive slope counts as increasing, so a flat series
/// reports `Decreasing`. Fewer than two points have no trend.
pub fn trend(values: &[f64]) -> Option<Trend> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (idx, value) in values.iter().enumerate() {
        let dx = idx as f64 - mean_x;
        sxy += dx * (value - mean_y);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let direction = if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    Some(Trend { slope, direction })
}

/// Pearson correlation coefficient. `None` with fewer than two pairs,
/// mismatched lengths or a constant column.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_picks_first_extreme_on_ties() {
        let series = TimeSeries::annual(
            Metric::Births,
            [(1971, 5.0), (1972, 9.0), (1973, 1.0), (1974, 9.0), (1975, 1.0)],
        );
        let summary = summarize(&series).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.sum, 25.0);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.max.date, NaiveDate::from_ymd_opt(1972, 1, 1).unwrap());
        assert_eq!(summary.min.date, NaiveDate::from_ymd_opt(1973, 1, 1).unwrap());
        assert!(summarize(&TimeSeries::annual(Metric::Births, Vec::<(i32, f64)>::new())).is_none());
    }

    #[test]
    fn decade_means_use_floor_division() {
        let series = TimeSeries::annual(Metric::Births, (1971..=1979).map(|y| (y, (y - 1970) as f64)));
        let decades = decade_means(&series);
        assert_eq!(decades.len(), 1);
        assert_eq!(decades.get(&1970), Some(&5.0));

        let series = TimeSeries::annual(Metric::Births, [(1979, 2.0), (1980, 4.0), (1989, 6.0)]);
        let decades = decade_means(&series);
        assert_eq!(decades.keys().copied().collect::<Vec<_>>(), vec![1970, 1980]);
        assert_eq!(decades[&1980], 5.0);
        assert_eq!(decade_of(-5), -10);
    }

    #[test]
    fn trend_direction_follows_slope_sign() {
        let up = trend(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(up.direction, TrendDirection::Increasing);
        assert!((up.slope - 1.0).abs() < 1e-12);

        let down = trend(&[5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_eq!(down.direction, TrendDirection::Decreasing);
        assert!((down.slope + 1.0).abs() < 1e-12);

        let flat = trend(&[3.0, 3.0, 3.0, 3.0, 3.0]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.direction, TrendDirection::Decreasing);

        assert!(trend(&[1.0]).is_none());
        assert!(trend(&[]).is_none());
    }

    #[test]
    fn pearson_of_linear_relations() {
        let xs: Vec<f64> = (1..=10).map(f64::from).collect();
        let double: Vec<f64> = xs.iter().map(|x| 2.0 * x).collect();
        let inverse: Vec<f64> = xs.iter().map(|x| -2.0 * x).collect();

        assert!((pearson(&xs, &double).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &inverse).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_is_undefined_for_degenerate_input() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[], &[]), None);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }
}
