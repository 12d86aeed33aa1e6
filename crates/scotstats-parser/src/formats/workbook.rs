use std::fs::{self, File};
use std::io::BufReader;

use calamine::{open_workbook_auto, Data, DataType, Reader, Sheets};

use crate::errors::ParserError;
use crate::model::{RawTable, SheetSelector, SourceDescriptor};
use crate::registry::TableReader;

use super::{build_raw_table, clean_cell, split_header};

pub struct WorkbookReader;

impl Default for WorkbookReader {
    fn default() -> Self {
        Self
    }
}

impl WorkbookReader {
    const NAME: &'static str = "WORKBOOK";

    fn open(descriptor: &SourceDescriptor) -> Result<Sheets<BufReader<File>>, ParserError> {
        // calamine folds a missing file into its own error type; check first so
        // the caller sees a plain I/O failure.
        fs::metadata(&descriptor.path).map_err(|source| ParserError::Io {
            reader: Self::NAME,
            path: descriptor.path.clone(),
            source,
        })?;

        open_workbook_auto(&descriptor.path).map_err(|source| ParserError::Workbook {
            reader: Self::NAME,
            path: descriptor.path.clone(),
            source,
        })
    }

    fn resolve_sheets(
        descriptor: &SourceDescriptor,
        available: &[String],
    ) -> Result<Vec<String>, ParserError> {
        let missing = |sheet: String| ParserError::MissingSheet {
            reader: Self::NAME,
            path: descriptor.path.clone(),
            sheet,
            available: available.to_vec(),
        };

        match &descriptor.sheet {
            SheetSelector::All => Ok(available.to_vec()),
            SheetSelector::First => available
                .first()
                .cloned()
                .map(|name| vec![name])
                .ok_or_else(|| missing("first".to_string())),
            SheetSelector::Index(index) => available
                .get(*index)
                .cloned()
                .map(|name| vec![name])
                .ok_or_else(|| missing(format!("#{index}"))),
            SheetSelector::Named(name) => available
                .iter()
                .find(|candidate| candidate.as_str() == name.as_str())
                .or_else(|| {
                    available
                        .iter()
                        .find(|candidate| candidate.trim().eq_ignore_ascii_case(name.trim()))
                })
                .cloned()
                .map(|name| vec![name])
                .ok_or_else(|| missing(name.clone())),
        }
    }
}

impl TableReader for WorkbookReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawTable>, ParserError> {
        let mut workbook = Self::open(descriptor)?;
        let available = workbook.sheet_names();
        let selected = Self::resolve_sheets(descriptor, &available)?;

        let mut tables = Vec::with_capacity(selected.len());
        for sheet in selected {
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|source| ParserError::Workbook {
                    reader: Self::NAME,
                    path: descriptor.path.clone(),
                    source,
                })?;

            // Ranges start at the first populated cell; pad back to A1 so skip
            // counts and column positions refer to the sheet as displayed.
            let (row_offset, col_offset) = range
                .start()
                .map(|(row, col)| (row as usize, col as usize))
                .unwrap_or((0, 0));

            let mut rows: Vec<Vec<Option<String>>> = vec![Vec::new(); row_offset];
            for cells in range.rows() {
                let mut row = vec![None; col_offset];
                row.extend(cells.iter().map(render_cell));
                rows.push(row);
            }

            let (header, data) =
                match split_header(Self::NAME, &descriptor.path, rows, descriptor.skip_rows) {
                    Ok(split) => split,
                    // Blank or short sheets (covers, notes) still yield their
                    // own table when every sheet is requested.
                    Err(ParserError::InvalidHeader { .. })
                        if matches!(descriptor.sheet, SheetSelector::All) =>
                    {
                        (Vec::new(), Vec::new())
                    }
                    Err(err) => return Err(err),
                };
            tables.push(build_raw_table(
                Self::NAME,
                &descriptor.path,
                descriptor.file_name(),
                Some(sheet),
                header,
                data,
            )?);
        }

        Ok(tables)
    }

    fn sheet_names(&self, descriptor: &SourceDescriptor) -> Result<Vec<String>, ParserError> {
        Ok(Self::open(descriptor)?.sheet_names())
    }
}

/// Renders a cell the way it reads in a spreadsheet: whole floats without a
/// fraction, dates as ISO `YYYY-MM-DD`, errors as nulls.
fn render_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(value) => clean_cell(value),
        Data::Int(value) => Some(value.to_string()),
        Data::Float(value) => Some(render_float(*value)),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(_) => cell
            .as_date()
            .map(|date| date.format("%Y-%m-%d").to_string()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => clean_cell(value),
    }
}

fn render_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
