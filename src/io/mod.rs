//! File readers and the CSV writer.
//!
//! Everything here produces or consumes a [`TabularDataset`]; the binding
//! core never touches files itself.
//!
//! [`TabularDataset`]: crate::dataset::TabularDataset

pub mod csv;
pub mod excel;

use std::path::Path;

use crate::dataset::TabularDataset;
use crate::error::{IoResult, ReadError};

pub use self::csv::{
    detect_delimiter, detect_encoding, read_csv_bytes, read_csv_file, write_csv_file,
    CsvReadOptions, CsvSource,
};
pub use self::excel::{read_excel_file, ExcelReadOptions};

/// Read any supported tabular file, dispatching on the extension.
pub fn read_tabular_file(
    path: impl AsRef<Path>,
    csv_options: &CsvReadOptions,
    excel_options: &ExcelReadOptions,
) -> IoResult<TabularDataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" | "txt" | "tsv" => Ok(read_csv_file(path, csv_options)?.dataset),
        "xlsx" | "xls" | "xlsm" => read_excel_file(path, excel_options),
        other => Err(ReadError::UnsupportedFormat(other.to_string())),
    }
}
