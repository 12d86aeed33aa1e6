use std::fs;

use csv::ReaderBuilder;

use crate::errors::ParserError;
use crate::model::{RawTable, SourceDescriptor, SourceFormat};
use crate::registry::TableReader;

use super::{build_raw_table, clean_cell, split_header};

pub struct DelimitedReader;

impl Default for DelimitedReader {
    fn default() -> Self {
        Self
    }
}

impl DelimitedReader {
    const NAME: &'static str = "DELIMITED";

    fn delimiter(descriptor: &SourceDescriptor) -> Result<u8, ParserError> {
        let SourceFormat::Delimited { delimiter } = descriptor.format else {
            return Err(ParserError::UnsupportedFormat {
                path: descriptor.path.clone(),
                reason: format!("{} cannot read {}", Self::NAME, descriptor.format),
            });
        };

        u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ParserError::UnsupportedFormat {
                path: descriptor.path.clone(),
                reason: format!("delimiter {delimiter:?} is not a single ASCII character"),
            })
    }

    /// Parses already-decoded text. Exposed separately from file access so
    /// callers holding text in memory skip the filesystem.
    pub fn read_text(
        &self,
        descriptor: &SourceDescriptor,
        content: &str,
    ) -> Result<RawTable, ParserError> {
        let delimiter = Self::delimiter(descriptor)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| ParserError::Csv {
                reader: Self::NAME,
                path: descriptor.path.clone(),
                source,
            })?;
            rows.push(record.iter().map(clean_cell).collect::<Vec<_>>());
        }

        let (header, data) = split_header(Self::NAME, &descriptor.path, rows, descriptor.skip_rows)?;
        build_raw_table(
            Self::NAME,
            &descriptor.path,
            descriptor.file_name(),
            None,
            header,
            data,
        )
    }
}

impl TableReader for DelimitedReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawTable>, ParserError> {
        let bytes = fs::read(&descriptor.path).map_err(|source| ParserError::Io {
            reader: Self::NAME,
            path: descriptor.path.clone(),
            source,
        })?;
        let content = descriptor.encoding.decode(&bytes);
        Ok(vec![self.read_text(descriptor, &content)?])
    }

    fn sheet_names(&self, _descriptor: &SourceDescriptor) -> Result<Vec<String>, ParserError> {
        Ok(Vec::new())
    }
}
