pub mod alignment;
pub mod chart;
pub mod config;
pub mod dates;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod types;

pub use alignment::{align, concat_series, AlignedDataset, AlignedRow};
pub use config::{ColumnMapping, ColumnSelector, PipelineConfig, SourceConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutput};
pub use report::AnalysisReport;
pub use types::{Frequency, Metric, Observation, TimeSeries, YearRange};
