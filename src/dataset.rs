//! The tabular dataset exchange type.
//!
//! A [`TabularDataset`] is the only shape the binding core understands:
//! ordered headers, ordered rows of nullable string cells, and optional
//! per-column type/nullability metadata supplied by whatever produced the
//! dataset (file reader, database extractor, test fixture). The core never
//! mutates a dataset; readers normalize rows to header width before the
//! dataset reaches the pipeline.

use serde::{Deserialize, Serialize};

/// An in-memory table: headers plus rows of nullable string cells.
///
/// Invariant: every row has exactly `headers.len()` cells. [`push_row`]
/// pads short rows with `None` and truncates long ones, so datasets built
/// through it always satisfy the invariant.
///
/// [`push_row`]: TabularDataset::push_row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabularDataset {
    /// Source name (table name or file stem).
    pub name: String,

    /// Column headers, in column order. Matched case-insensitively by the core.
    pub headers: Vec<String>,

    /// Data rows. `None` cells are absent values (SQL NULL, empty cell).
    pub rows: Vec<Vec<Option<String>>>,

    /// Declared column types, aligned to `headers`, when the producer knows them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_types: Option<Vec<Option<String>>>,

    /// Declared column nullability, aligned to `headers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_nullability: Option<Vec<Option<String>>>,
}

impl TabularDataset {
    /// Create an empty dataset with the given headers.
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
            column_types: None,
            column_nullability: None,
        }
    }

    /// Create a dataset from rows, normalizing each row to header width.
    pub fn with_rows(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        let mut dataset = Self::new(name, headers);
        for row in rows {
            dataset.push_row(row);
        }
        dataset
    }

    /// Append a row, padding with `None` or truncating to header width.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Whether the dataset carries a header row at all.
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a header, compared case-insensitively.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(header))
    }

    /// Declared type of a column, when metadata is present.
    pub fn column_type(&self, index: usize) -> Option<&str> {
        self.column_types
            .as_ref()
            .and_then(|types| types.get(index))
            .and_then(|t| t.as_deref())
    }

    /// Cell at (row, column); `None` for absent cells or out-of-range indexes.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }
}
