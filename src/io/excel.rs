//! Excel reading (first worksheet) into a dataset.
//!
//! Real-world bid templates bury the header under banner and instruction
//! rows, so the header row offset is configurable: `header_row` leading
//! rows are skipped, the next row is the header, everything after is data.

use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use tracing::debug;

use crate::dataset::TabularDataset;
use crate::error::{IoResult, ReadError};

/// How to read a workbook.
#[derive(Debug, Clone, Default)]
pub struct ExcelReadOptions {
    /// Rows to skip before the header row.
    pub header_row: usize,
}

/// Read the first worksheet of an Excel file into a dataset.
pub fn read_excel_file(
    path: impl AsRef<Path>,
    options: &ExcelReadOptions,
) -> IoResult<TabularDataset> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workbook")
        .to_string();

    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReadError::Excel(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let Some(sheet_name) = sheet_names.first().cloned() else {
        return Err(ReadError::Excel("workbook has no worksheets".to_string()));
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReadError::Excel(e.to_string()))?;

    let mut rows = range.rows().skip(options.header_row);
    let Some(header_row) = rows.next() else {
        return Err(ReadError::NoHeaders(name));
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReadError::NoHeaders(name));
    }

    let mut dataset = TabularDataset::new(name, headers);
    for data_row in rows {
        let row: Vec<Option<String>> = data_row
            .iter()
            .map(|cell| {
                let text = cell.to_string().trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            })
            .collect();

        if row.iter().all(Option::is_none) {
            continue;
        }
        dataset.push_row(row);
    }

    debug!(
        sheet = %sheet_name,
        rows = dataset.rows.len(),
        skipped = options.header_row,
        "read workbook"
    );
    Ok(dataset)
}
