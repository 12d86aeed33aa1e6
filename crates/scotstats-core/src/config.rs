use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use scotstats_parser::{SheetSelector, SourceDescriptor, SourceFormat, TextEncoding};
use serde::{Deserialize, Serialize};

use crate::dates::DateFormat;
use crate::error::{PipelineError, Result};
use crate::types::{Frequency, Metric, YearRange};

pub const DEFAULT_CHART_PATH: &str = "economic_demographic_analysis.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelector {
    Named(String),
    Position(usize),
}

impl ColumnSelector {
    pub fn named(name: impl Into<String>) -> Self {
        ColumnSelector::Named(name.into())
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Named(name) => write!(f, "'{name}'"),
            ColumnSelector::Position(idx) => write!(f, "#{idx}"),
        }
    }
}

/// Which raw columns become `Date` and the metric column. Everything else is
/// dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: ColumnSelector,
    pub value: ColumnSelector,
}

impl ColumnMapping {
    pub fn new(date: ColumnSelector, value: ColumnSelector) -> Self {
        Self { date, value }
    }

    /// The first two columns, whatever their header says.
    pub fn positional() -> Self {
        Self::new(ColumnSelector::Position(0), ColumnSelector::Position(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub metric: Metric,
    pub path: PathBuf,
    /// Inferred from the file extension when absent.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub sheet: SheetSelector,
    #[serde(default)]
    pub encoding: TextEncoding,
    pub columns: ColumnMapping,
    /// Rows directly under the header that carry units or notes.
    #[serde(default)]
    pub skip_data_rows: usize,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default)]
    pub frequency: Frequency,
}

impl SourceConfig {
    /// National Records of Scotland BT.3 births time series.
    pub fn births() -> Self {
        Self {
            name: "births".to_string(),
            metric: Metric::Births,
            path: PathBuf::from("bt3-2023-births-time-series.csv"),
            format: Some(SourceFormat::CSV),
            skip_rows: 3,
            sheet: SheetSelector::First,
            encoding: TextEncoding::Latin1,
            columns: ColumnMapping::new(
                ColumnSelector::named("Year"),
                ColumnSelector::named("Total"),
            ),
            skip_data_rows: 0,
            date_format: DateFormat::YearOnly,
            frequency: Frequency::Annual,
        }
    }

    /// ONS labour market series; annual, quarterly and monthly rows share
    /// one column.
    pub fn unemployment() -> Self {
        Self {
            name: "unemployment".to_string(),
            metric: Metric::UnemploymentRate,
            path: PathBuf::from("unemployment_rate.csv"),
            format: Some(SourceFormat::CSV),
            skip_rows: 7,
            sheet: SheetSelector::First,
            encoding: TextEncoding::Utf8,
            columns: ColumnMapping::positional(),
            skip_data_rows: 0,
            date_format: DateFormat::Flexible,
            frequency: Frequency::SubAnnual,
        }
    }

    pub fn cpi_historical() -> Self {
        Self {
            name: "cpi_historical".to_string(),
            path: PathBuf::from("cpi_historical_data.xlsx"),
            ..Self::cpi_workbook()
        }
    }

    pub fn cpi_current() -> Self {
        Self {
            name: "cpi_current".to_string(),
            path: PathBuf::from("cpi_current_data.xlsx"),
            ..Self::cpi_workbook()
        }
    }

    fn cpi_workbook() -> Self {
        Self {
            name: String::new(),
            metric: Metric::Cpi,
            path: PathBuf::new(),
            format: Some(SourceFormat::Workbook),
            skip_rows: 4,
            sheet: SheetSelector::Named("Table 1".to_string()),
            encoding: TextEncoding::Utf8,
            columns: ColumnMapping::positional(),
            skip_data_rows: 1,
            date_format: DateFormat::Flexible,
            frequency: Frequency::SubAnnual,
        }
    }

    /// Relative paths resolve against `data_dir`.
    pub fn descriptor(&self, data_dir: &Path) -> Result<SourceDescriptor> {
        let path = if self.path.is_absolute() {
            self.path.clone()
        } else {
            data_dir.join(&self.path)
        };
        let format = match self.format {
            Some(format) => format,
            None => SourceFormat::infer(&path)?,
        };

        Ok(SourceDescriptor::new(path, format)
            .with_skip_rows(self.skip_rows)
            .with_sheet(self.sheet.clone())
            .with_encoding(self.encoding))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub year_range: YearRange,
    #[serde(default = "default_chart_path")]
    pub chart_path: PathBuf,
    #[serde(default = "default_sources", rename = "source")]
    pub sources: Vec<SourceConfig>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_chart_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHART_PATH)
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::births(), SourceConfig::unemployment()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            year_range: YearRange::default(),
            chart_path: default_chart_path(),
            sources: default_sources(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, Path::new("<inline>"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// `origin` only labels parse errors.
    fn parse(content: &str, origin: &Path) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|source| PipelineError::ConfigFile {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Adds the historical and current CPI workbooks unless a CPI source is
    /// already configured.
    pub fn with_cpi(mut self) -> Self {
        if !self.sources.iter().any(|source| source.metric == Metric::Cpi) {
            self.sources.push(SourceConfig::cpi_historical());
            self.sources.push(SourceConfig::cpi_current());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(PipelineError::Config(
                "at least one source must be configured".to_string(),
            ));
        }
        if self.year_range.start > self.year_range.end {
            return Err(PipelineError::Config(format!(
                "year range start {} is after end {}",
                self.year_range.start, self.year_range.end
            )));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }

        Ok(())
    }

    /// Metrics in the order their first source appears.
    pub fn metrics(&self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        for source in &self.sources {
            if !metrics.contains(&source.metric) {
                metrics.push(source.metric);
            }
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_published_file_layouts() {
        let config = PipelineConfig::default();
        assert_eq!(config.year_range, YearRange::new(1971, 2023));
        assert_eq!(config.metrics(), vec![Metric::Births, Metric::UnemploymentRate]);

        let births = &config.sources[0];
        assert_eq!(births.skip_rows, 3);
        assert_eq!(births.encoding, TextEncoding::Latin1);
        let unemployment = &config.sources[1];
        assert_eq!(unemployment.skip_rows, 7);
        assert_eq!(unemployment.columns, ColumnMapping::positional());

        let with_cpi = config.with_cpi();
        assert_eq!(with_cpi.sources.len(), 4);
        assert_eq!(with_cpi.sources[2].skip_rows, 4);
        assert_eq!(
            with_cpi.sources[3].sheet,
            SheetSelector::Named("Table 1".to_string())
        );
        assert_eq!(with_cpi.clone().with_cpi(), with_cpi);
    }

    #[test]
    fn parses_toml_sources() {
        let config = PipelineConfig::from_toml_str(
            r#"
            data_dir = "data"
            chart_path = "out.svg"
            year_range = { start = 1980, end = 1990 }

            [[source]]
            name = "births"
            metric = "births"
            path = "births.csv"
            skip_rows = 3
            encoding = "latin1"
            date_format = "year_only"
            columns = { date = { named = "Year" }, value = { named = "Total" } }

            [[source]]
            name = "cpi"
            metric = "cpi"
            path = "cpi.xlsx"
            skip_rows = 4
            sheet = { named = "Table 1" }
            skip_data_rows = 1
            frequency = "sub_annual"
            columns = { date = { position = 0 }, value = { position = 1 } }
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.year_range, YearRange::new(1980, 1990));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].columns.value, ColumnSelector::named("Total"));
        assert_eq!(config.sources[0].format, None);
        assert_eq!(config.sources[1].frequency, Frequency::SubAnnual);
        assert_eq!(config.sources[1].date_format, DateFormat::Flexible);

        let descriptor = config.sources[1].descriptor(&config.data_dir).unwrap();
        assert_eq!(descriptor.path, PathBuf::from("data/cpi.xlsx"));
        assert_eq!(descriptor.format, SourceFormat::Workbook);
        assert_eq!(descriptor.skip_rows, 4);
    }

    #[test]
    fn rejects_inverted_range_and_duplicate_names() {
        let inverted = PipelineConfig::from_toml_str("year_range = { start = 2000, end = 1990 }");
        assert!(matches!(inverted, Err(PipelineError::Config(_))));

        let mut config = PipelineConfig::default();
        config.sources.push(SourceConfig::births());
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        config.sources.clear();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn load_reads_the_file_and_names_it_in_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("scotstats.toml");
        std::fs::write(&good, "year_range = { start = 1975, end = 1985 }\n").unwrap();
        let config = PipelineConfig::load(&good).unwrap();
        assert_eq!(config.year_range, YearRange::new(1975, 1985));
        assert_eq!(config.sources, PipelineConfig::default().sources);

        let bad = dir.path().join("broken.toml");
        std::fs::write(&bad, "year_range = [").unwrap();
        match PipelineConfig::load(&bad) {
            Err(PipelineError::ConfigFile { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected ConfigFile, got {other:?}"),
        }

        match PipelineConfig::from_toml_str("year_range = [") {
            Err(PipelineError::ConfigFile { path, .. }) => assert_eq!(path, PathBuf::from("<inline>")),
            other => panic!("expected ConfigFile, got {other:?}"),
        }

        let missing = PipelineConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(PipelineError::Io(_))));
    }
}
