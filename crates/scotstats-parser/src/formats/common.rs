use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::RawTable;

/// Splits the header row off a sequence of rows after skipping `skip_rows`
/// metadata rows. Running out of rows before the header is fatal.
pub(crate) fn split_header(
    reader: &'static str,
    path: &Path,
    mut rows: Vec<Vec<Option<String>>>,
    skip_rows: usize,
) -> Result<(Vec<String>, Vec<Vec<Option<String>>>), ParserError> {
    if rows.len() <= skip_rows {
        return Err(ParserError::InvalidHeader {
            reader,
            path: path.to_path_buf(),
            row_index: skip_rows,
            message: format!(
                "source has {} rows, nothing left after skipping {skip_rows}",
                rows.len()
            ),
        });
    }

    let mut data = rows.split_off(skip_rows);
    let header_cells = data.remove(0);
    if header_cells.iter().all(Option::is_none) {
        return Err(ParserError::InvalidHeader {
            reader,
            path: path.to_path_buf(),
            row_index: skip_rows,
            message: "header row is empty".to_string(),
        });
    }

    Ok((normalize_header(&header_cells), data))
}

/// Blank names become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
/// suffixes so every column stays addressable by label.
pub(crate) fn normalize_header(cells: &[Option<String>]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(cells.len());
    let mut names = Vec::with_capacity(cells.len());

    for (idx, cell) in cells.iter().enumerate() {
        let base = match cell.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Unnamed: {idx}"),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

/// Empty or whitespace-only cells are nulls.
pub(crate) fn clean_cell(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn build_raw_table(
    reader: &'static str,
    path: &Path,
    source: String,
    sheet: Option<String>,
    header: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
) -> Result<RawTable, ParserError> {
    let mut columns: Vec<Column> = Vec::with_capacity(header.len());
    for (col_idx, name) in header.iter().enumerate() {
        let values: Vec<Option<&str>> = rows
            .iter()
            .map(|row| row.get(col_idx).and_then(|cell| cell.as_deref()))
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }

    let df = DataFrame::new(columns).map_err(|source| ParserError::Frame {
        reader,
        path: path.to_path_buf(),
        source,
    })?;

    Ok(RawTable { source, sheet, df })
}
