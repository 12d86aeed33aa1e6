use std::path::{Path, PathBuf};

use scotstats_parser::{read_source, RawTable};
use tracing::{debug, info, warn};

use crate::alignment::{align, concat_series, AlignedDataset};
use crate::chart::render_chart;
use crate::config::{PipelineConfig, SourceConfig};
use crate::error::Result;
use crate::normalize::{normalize_table, NormalizeRules};
use crate::report::{AnalysisReport, SourceSummary};
use crate::types::{Frequency, TimeSeries};

/// Raw tables read for one configured source.
#[derive(Debug)]
pub struct IngestedSource<'a> {
    pub config: &'a SourceConfig,
    pub tables: Vec<RawTable>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    /// One series per metric, restricted to the year range and reduced to
    /// yearly values.
    pub series: Vec<TimeSeries>,
    pub aligned: AlignedDataset,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest, normalize, align and summarize. Any I/O or header failure
    /// aborts the whole run.
    pub fn run(&self) -> Result<PipelineOutput> {
        let range = self.config.year_range;
        info!(
            sources = self.config.sources.len(),
            data_dir = %self.config.data_dir.display(),
            year_range = %range,
            "Starting pipeline run"
        );

        let ingested = self.ingest()?;
        let (merged, sources) = self.normalize(&ingested)?;

        let refs: Vec<&TimeSeries> = merged.iter().collect();
        let aligned = align(&refs, range);
        if aligned.is_empty() {
            warn!(year_range = %range, "No overlapping years across sources");
        } else {
            info!(rows = aligned.len(), "Aligned series on year");
        }

        let report = AnalysisReport::build(range, sources, &merged, &aligned);
        let series = merged.iter().map(|s| s.for_reporting(range)).collect();
        info!(metrics = report.metrics.len(), "Summary computed");

        Ok(PipelineOutput {
            series,
            aligned,
            report,
        })
    }

    pub fn ingest(&self) -> Result<Vec<IngestedSource<'_>>> {
        let mut ingested = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            let descriptor = source.descriptor(&self.config.data_dir)?;
            let tables = read_source(&descriptor)?;
            for table in &tables {
                debug!(
                    source = %source.name,
                    table = %table.label(),
                    rows = table.height(),
                    columns = table.width(),
                    "Read table"
                );
            }
            ingested.push(IngestedSource {
                config: source,
                tables,
            });
        }
        Ok(ingested)
    }

    /// Normalizes every table and merges sources that share a metric, in the
    /// order metrics first appear in the configuration.
    pub fn normalize(
        &self,
        ingested: &[IngestedSource<'_>],
    ) -> Result<(Vec<TimeSeries>, Vec<SourceSummary>)> {
        let mut per_source: Vec<(SourceSummary, TimeSeries)> = Vec::with_capacity(ingested.len());

        for source in ingested {
            let rules = NormalizeRules::from(source.config);
            let mut parts = Vec::with_capacity(source.tables.len());
            let (mut rows_read, mut rows_dropped) = (0, 0);
            for table in &source.tables {
                let normalized = normalize_table(table, &rules)?;
                rows_read += normalized.rows_read;
                rows_dropped += normalized.rows_dropped;
                parts.push(normalized.series);
            }

            let series = concat_series(source.config.metric, &parts);
            info!(
                source = %source.config.name,
                metric = %source.config.metric,
                rows_read,
                rows_dropped,
                kept = series.len(),
                "Normalized source"
            );

            per_source.push((
                SourceSummary {
                    name: source.config.name.clone(),
                    metric: source.config.metric,
                    tables: source.tables.len(),
                    rows_read,
                    rows_kept: series.len(),
                },
                series,
            ));
        }

        let mut merged = Vec::new();
        for metric in self.config.metrics() {
            let parts: Vec<TimeSeries> = per_source
                .iter()
                .filter(|(summary, _)| summary.metric == metric)
                .map(|(_, series)| series.clone())
                .collect();
            let series = concat_series(metric, &parts);

            let duplicates = series.duplicate_years();
            if series.frequency == Frequency::Annual && duplicates > 0 {
                warn!(
                    metric = %metric,
                    duplicates,
                    "Annual series repeats years; rows are kept"
                );
            }
            merged.push(series);
        }

        let summaries = per_source.into_iter().map(|(summary, _)| summary).collect();
        Ok((merged, summaries))
    }

    /// Writes the chart to the configured path.
    pub fn render_chart(&self, output: &PipelineOutput) -> Result<PathBuf> {
        let path = self.config.chart_path.clone();
        self.render_chart_to(output, &path)?;
        Ok(path)
    }

    pub fn render_chart_to(&self, output: &PipelineOutput, path: &Path) -> Result<()> {
        render_chart(&output.report, &output.series, path)
    }
}
