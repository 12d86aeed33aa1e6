use std::path::PathBuf;

use scotstats_core::report::render_text;
use scotstats_core::{Metric, Pipeline, PipelineConfig, PipelineError, SourceConfig, YearRange};
use scotstats_parser::SheetSelector;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../scotstats-parser/tests/data")
}

fn fixture_config() -> PipelineConfig {
    let mut births = SourceConfig::births();
    births.path = PathBuf::from("bt3-births-time-series.csv");
    PipelineConfig {
        data_dir: data_dir(),
        sources: vec![births, SourceConfig::unemployment()],
        ..PipelineConfig::default()
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

#[test]
fn default_sources_produce_yearly_series_and_alignment() {
    let pipeline = Pipeline::new(fixture_config()).expect("valid config");
    let output = pipeline.run().expect("pipeline succeeded");

    let births = &output.series[0];
    assert_eq!(births.metric, Metric::Births);
    assert_eq!(births.years(), vec![1971, 1972, 1973, 1974, 1975]);
    assert_eq!(births.values()[0], 86_728.0);

    let rate = &output.series[1];
    assert_eq!(rate.metric, Metric::UnemploymentRate);
    assert_eq!(rate.years(), vec![1971, 1972, 1973]);
    let values = rate.values();
    assert_close(values[0], 4.0);
    assert_close(values[1], 17.0 / 3.0);
    assert_close(values[2], 4.5);

    assert_eq!(output.aligned.years(), vec![1971, 1972, 1973]);
    let frame = output.aligned.to_frame().unwrap();
    assert_eq!(frame.height(), 3);

    let births_source = &output.report.sources[0];
    assert_eq!(births_source.name, "births");
    assert_eq!(births_source.rows_read, 9);
    assert_eq!(births_source.rows_kept, 6);

    let unemployment = output.report.metric(Metric::UnemploymentRate).unwrap();
    assert_eq!(unemployment.records, 7);

    let correlation = output.report.correlation(Metric::UnemploymentRate).unwrap();
    assert_eq!(correlation.len(), 3);
    assert_eq!(correlation.years, output.aligned.years());
    let aligned_rates = output.aligned.column(Metric::UnemploymentRate).unwrap();
    let plotted: Vec<f64> = correlation.points.iter().map(|(x, _)| *x).collect();
    assert_eq!(plotted, aligned_rates);
    assert!(correlation.coefficient.is_some());

    let text = render_text(&output.report);
    assert!(text.contains("Births data: 5 records from 1971-01-01 to 1975-01-01"));
    assert!(text.contains("Total births: 377,705"));
    assert!(text.contains("Highest year: 1971 (86,728 births)"));
    assert!(text.contains("Lowest year: 1975 (67,943 births)"));
    assert!(text.contains("Births trend: Decreasing"));
}

#[test]
fn newest_first_births_keep_row_order_and_trend_against_it() {
    let mut config = fixture_config();
    config.sources[0].path = PathBuf::from("bt3-births-newest-first.csv");
    let output = Pipeline::new(config).unwrap().run().unwrap();

    let births = &output.series[0];
    assert_eq!(births.years(), vec![1975, 1974, 1973, 1973, 1972, 1971]);
    assert_eq!(births.values()[0], 67_943.0);
    assert_eq!(births.duplicate_years(), 1);

    let trend = output.report.metric(Metric::Births).unwrap().trend.unwrap();
    assert!(trend.slope > 0.0);

    // The repeated year joins once per births row.
    assert_eq!(output.aligned.years(), vec![1973, 1973, 1972, 1971]);
    assert_eq!(
        output.aligned.column(Metric::Births),
        Some(vec![74_392.0, 74_000.0, 78_550.0, 86_728.0])
    );
    assert_eq!(output.report.correlation(Metric::UnemploymentRate).unwrap().len(), 4);

    let text = render_text(&output.report);
    assert!(text.contains("Births data: 6 records from 1971-01-01 to 1975-01-01"));
    assert!(text.contains("Births trend: Increasing"));
}

#[test]
fn cpi_workbooks_are_merged_into_one_series() {
    let pipeline = Pipeline::new(fixture_config().with_cpi()).unwrap();
    let output = pipeline.run().unwrap();

    assert_eq!(output.series.len(), 3);
    let cpi = &output.series[2];
    assert_eq!(cpi.metric, Metric::Cpi);
    assert_eq!(cpi.years(), vec![1971, 1972, 1973]);
    assert_eq!(cpi.values(), vec![11.0, 14.5, 22.0]);

    let historical = &output.report.sources[2];
    assert_eq!(historical.name, "cpi_historical");
    assert_eq!(historical.tables, 1);
    assert_eq!(historical.rows_kept, 3);

    assert_eq!(output.aligned.metrics.len(), 3);
    assert_eq!(output.aligned.len(), 3);
    assert_eq!(output.aligned.column(Metric::Cpi), Some(vec![11.0, 14.5, 22.0]));
    assert_eq!(output.report.correlations.len(), 2);

    let text = render_text(&output.report);
    assert!(text.contains("CPI DATA (1971-2023):"));
    assert!(text.contains("Highest CPI: 22.0 (1973)"));
}

#[test]
fn reading_every_sheet_skips_over_blank_sheets() {
    let mut config = fixture_config().with_cpi();
    let current = config
        .sources
        .iter_mut()
        .find(|source| source.name == "cpi_current")
        .unwrap();
    current.path = PathBuf::from("cpi_with_blank_sheet.xlsx");
    current.sheet = SheetSelector::All;
    let output = Pipeline::new(config).unwrap().run().unwrap();

    let summary = output
        .report
        .sources
        .iter()
        .find(|source| source.name == "cpi_current")
        .unwrap();
    assert_eq!(summary.tables, 3);
    assert_eq!(summary.rows_kept, 3);

    let cpi = output.series.iter().find(|s| s.metric == Metric::Cpi).unwrap();
    assert_eq!(cpi.values(), vec![11.0, 14.5, 22.0]);
}

#[test]
fn narrow_range_outside_the_data_reports_no_data() {
    let mut config = fixture_config();
    config.year_range = YearRange::new(1990, 2000);
    let output = Pipeline::new(config).unwrap().run().unwrap();

    assert!(output.aligned.is_empty());
    assert!(output.series.iter().all(|s| s.is_empty()));
    let text = render_text(&output.report);
    assert!(text.contains("No data in 1990-2000"));
    assert!(text.contains("Insufficient overlapping data for correlation analysis"));
}

#[test]
fn missing_input_aborts_the_run() {
    let mut config = fixture_config();
    config.sources[1].path = PathBuf::from("does_not_exist.csv");
    let err = Pipeline::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, PipelineError::Parser(_)), "unexpected error {err:?}");
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = fixture_config();
    config.year_range = YearRange::new(2020, 2010);
    assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
}
