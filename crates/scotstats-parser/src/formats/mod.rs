mod common;
mod delimited;
mod workbook;

pub use delimited::DelimitedReader;
pub use workbook::WorkbookReader;

pub(crate) use common::{build_raw_table, clean_cell, split_header};
