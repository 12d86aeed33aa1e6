//! Date coercion for the mixed encodings found in the source files.
//!
//! Statistical releases mix bare years (`1971`), quarters (`1971 Q1`),
//! months (`1971 JAN`, `Jan 1971`) and ISO dates in the same column. Anything
//! that is not one of the recognised forms coerces to `None` and the row is
//! dropped by the caller.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// Only whole years are valid; they map to January 1st.
    YearOnly,
    #[default]
    Flexible,
}

/// Parses a whole four-digit year, tolerating a zero fraction (`1971.0`) as
/// spreadsheets often store years as floats.
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let year = match trimmed.parse::<i32>() {
        Ok(year) => year,
        Err(_) => {
            let value = trimmed.parse::<f64>().ok()?;
            if !value.is_finite() || value.fract() != 0.0 {
                return None;
            }
            value as i32
        }
    };
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

pub fn parse_date(raw: &str, format: DateFormat) -> Option<NaiveDate> {
    if let Some(year) = parse_year(raw) {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    match format {
        DateFormat::YearOnly => None,
        DateFormat::Flexible => parse_flexible(raw.trim()).filter(|date| {
            let year = chrono::Datelike::year(date);
            (MIN_YEAR..=MAX_YEAR).contains(&year)
        }),
    }
}

fn parse_flexible(value: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if let [first, second] = tokens.as_slice() {
        if let Some(date) = year_and_period(first, second) {
            return Some(date);
        }
        // `Jan 1971`
        if let (Some(month), Some(year)) = (month_from_name(first), parse_year(second)) {
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }

    for pattern in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return Some(date);
        }
    }

    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(datetime.date());
        }
    }

    // `1971-03`
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()
}

/// `1971 Q2` or `1971 MAR`/`1971 March`.
fn year_and_period(year: &str, period: &str) -> Option<NaiveDate> {
    let year = parse_year(year)?;
    if let Some(quarter) = period
        .strip_prefix('Q')
        .or_else(|| period.strip_prefix('q'))
    {
        let quarter: u32 = quarter.parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1);
    }
    let month = month_from_name(period)?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Accepts full month names or any prefix of at least three letters
/// (`JAN`, `Sept`), case-insensitive.
fn month_from_name(token: &str) -> Option<u32> {
    let lower = token.trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(lower.as_str()))
        .map(|idx| idx as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn four_digit_years_round_trip_to_the_same_year() {
        for year in [1855, 1971, 1999, 2023, 9999] {
            let date = parse_date(&year.to_string(), DateFormat::YearOnly).unwrap();
            assert_eq!(date, ymd(year, 1, 1));
        }
        assert_eq!(parse_year(" 1971.0 "), Some(1971));
    }

    #[test]
    fn non_numeric_and_out_of_range_years_are_rejected() {
        for raw in ["", "Year", "Footnotes", "1971p", "1971.5", "999", "10000", "NaN"] {
            assert_eq!(parse_date(raw, DateFormat::YearOnly), None, "{raw}");
        }
    }

    #[test]
    fn year_only_rejects_sub_annual_forms() {
        assert_eq!(parse_date("1971 Q1", DateFormat::YearOnly), None);
        assert_eq!(parse_date("1971-03-01", DateFormat::YearOnly), None);
    }

    #[test]
    fn flexible_accepts_periods_and_iso_dates() {
        let cases = [
            ("1971 Q1", ymd(1971, 1, 1)),
            ("1971 Q4", ymd(1971, 10, 1)),
            ("1992 MAR", ymd(1992, 3, 1)),
            ("1992 September", ymd(1992, 9, 1)),
            ("Sept 1992", ymd(1992, 9, 1)),
            ("1988-04-15", ymd(1988, 4, 15)),
            ("15/04/1988", ymd(1988, 4, 15)),
            ("1988-04", ymd(1988, 4, 1)),
            ("1988-04-15 00:00:00", ymd(1988, 4, 15)),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_date(raw, DateFormat::Flexible), Some(expected), "{raw}");
        }
    }

    #[test]
    fn flexible_rejects_garbage() {
        for raw in ["1971 Q5", "1971 XYZ", "Important notes", "n/a", "1971 Q"] {
            assert_eq!(parse_date(raw, DateFormat::Flexible), None, "{raw}");
        }
    }
}
