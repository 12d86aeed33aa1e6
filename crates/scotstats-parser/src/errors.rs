use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{reader} could not read {}: {source}", path.display())]
    Io {
        reader: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{reader} CSV error in {}: {source}", path.display())]
    Csv {
        reader: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{reader} could not open workbook {}: {source}", path.display())]
    Workbook {
        reader: &'static str,
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{reader} sheet '{sheet}' not found in {}; available sheets: {available:?}", path.display())]
    MissingSheet {
        reader: &'static str,
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("{reader} header row {row_index} invalid in {}: {message}", path.display())]
    InvalidHeader {
        reader: &'static str,
        path: PathBuf,
        row_index: usize,
        message: String,
    },

    #[error("unsupported source format for {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("{reader} failed to assemble table for {}: {source}", path.display())]
    Frame {
        reader: &'static str,
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}
