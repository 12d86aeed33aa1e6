use std::fmt;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Decode raw file bytes. Latin-1 maps every byte to the code point of the
    /// same value, so it never fails.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => {
                let text = String::from_utf8_lossy(bytes);
                text.strip_prefix('\u{feff}')
                    .unwrap_or(text.as_ref())
                    .to_string()
            }
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Delimited {
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    Workbook,
}

fn default_delimiter() -> char {
    ','
}

impl SourceFormat {
    pub const CSV: SourceFormat = SourceFormat::Delimited { delimiter: ',' };

    pub fn infer(path: &Path) -> Result<Self, ParserError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") | Some("txt") => Ok(SourceFormat::CSV),
            Some("tsv") => Ok(SourceFormat::Delimited { delimiter: '\t' }),
            Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
                Ok(SourceFormat::Workbook)
            }
            other => Err(ParserError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: match other {
                    Some(ext) => format!("unrecognized extension '.{ext}'"),
                    None => "file has no extension".to_string(),
                },
            }),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Delimited { delimiter } => write!(f, "delimited({delimiter:?})"),
            SourceFormat::Workbook => f.write_str("workbook"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    #[default]
    First,
    All,
    Named(String),
    Index(usize),
}

impl SheetSelector {
    /// Parses the command-line spelling: `all`, `first`, `#<index>` or a sheet name.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return SheetSelector::All;
        }
        if trimmed.eq_ignore_ascii_case("first") {
            return SheetSelector::First;
        }
        if let Some(index) = trimmed.strip_prefix('#').and_then(|i| i.parse().ok()) {
            return SheetSelector::Index(index);
        }
        SheetSelector::Named(trimmed.to_string())
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => f.write_str("first"),
            SheetSelector::All => f.write_str("all"),
            SheetSelector::Named(name) => write!(f, "'{name}'"),
            SheetSelector::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Everything needed to pull raw tables out of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub format: SourceFormat,
    /// Metadata rows preceding the header row.
    pub skip_rows: usize,
    /// Ignored for delimited text.
    pub sheet: SheetSelector,
    /// Ignored for workbooks.
    pub encoding: TextEncoding,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
            skip_rows: 0,
            sheet: SheetSelector::default(),
            encoding: TextEncoding::default(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ParserError> {
        let path = path.into();
        let format = SourceFormat::infer(&path)?;
        Ok(Self::new(path, format))
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// An untyped table as read from a source: every column is a nullable string
/// column named after the header row.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: String,
    pub sheet: Option<String>,
    pub df: DataFrame,
}

impl RawTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn header(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect()
    }

    /// Cell at `(row, column)`, `None` when empty or out of bounds.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        if row >= self.df.height() {
            return None;
        }
        let column = self.df.get_columns().get(column)?;
        column.str().ok()?.get(row)
    }

    pub fn label(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("{} [{sheet}]", self.source),
            None => self.source.clone(),
        }
    }
}
