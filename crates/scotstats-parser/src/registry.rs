use std::path::Path;

use crate::errors::ParserError;
use crate::formats::{DelimitedReader, WorkbookReader};
use crate::model::{RawTable, SourceDescriptor, SourceFormat};

pub trait TableReader {
    fn name(&self) -> &'static str;
    fn read(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawTable>, ParserError>;
    /// Sheet names in workbook order; empty for formats without sheets.
    fn sheet_names(&self, descriptor: &SourceDescriptor) -> Result<Vec<String>, ParserError>;
}

static DELIMITED: DelimitedReader = DelimitedReader;
static WORKBOOK: WorkbookReader = WorkbookReader;

pub fn reader_for(format: SourceFormat) -> &'static dyn TableReader {
    match format {
        SourceFormat::Delimited { .. } => &DELIMITED,
        SourceFormat::Workbook => &WORKBOOK,
    }
}

/// Reads every table the descriptor selects. Delimited text always yields
/// exactly one table; workbooks yield one per selected sheet.
pub fn read_source(descriptor: &SourceDescriptor) -> Result<Vec<RawTable>, ParserError> {
    reader_for(descriptor.format).read(descriptor)
}

pub fn list_sheets(path: &Path) -> Result<Vec<String>, ParserError> {
    let descriptor = SourceDescriptor::from_path(path)?;
    reader_for(descriptor.format).sheet_names(&descriptor)
}
