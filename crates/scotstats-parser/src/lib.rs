pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::ParserError;
pub use model::{RawTable, SheetSelector, SourceDescriptor, SourceFormat, TextEncoding};
pub use registry::{list_sheets, read_source, reader_for, TableReader};
