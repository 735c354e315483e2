//! CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Files arrive from many export tools: UTF-8 or Latin-1, semicolons or
//! commas or tabs. Detection inspects the raw bytes (chardet) and the
//! first line (separator frequency), then a standard CSV reader does the
//! quoted-field work. Rows are normalized to header width and fully blank
//! rows are skipped before the dataset reaches the binding core.

use std::path::Path;

use tracing::debug;

use crate::dataset::TabularDataset;
use crate::error::{IoResult, ReadError};

/// How to read a CSV file. `None` fields are auto-detected.
#[derive(Debug, Clone, Default)]
pub struct CsvReadOptions {
    pub delimiter: Option<char>,
    pub encoding: Option<String>,
}

/// A parsed CSV plus the detection metadata callers report to operators.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub dataset: TabularDataset,
    pub encoding: String,
    pub delimiter: char,
}

/// Detect the encoding of raw bytes.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using a named encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> IoResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).to_string()),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        other => {
            let Some(encoding) = encoding_rs::Encoding::for_label(other.as_bytes()) else {
                return Err(ReadError::Encoding(other.to_string()));
            };
            Ok(encoding.decode(bytes).0.to_string())
        }
    }
}

/// Detect the delimiter by counting candidates in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");
    let candidates = [';', ',', '\t', '|'];

    let mut best = ';';
    let mut best_count = 0;
    for candidate in candidates {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }
    best
}

/// Read a CSV file into a dataset, detecting encoding and delimiter
/// unless the options pin them down.
pub fn read_csv_file(path: impl AsRef<Path>, options: &CsvReadOptions) -> IoResult<CsvSource> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string();
    read_csv_bytes(name, &bytes, options)
}

/// Read CSV bytes into a dataset.
pub fn read_csv_bytes(
    name: impl Into<String>,
    bytes: &[u8],
    options: &CsvReadOptions,
) -> IoResult<CsvSource> {
    let name = name.into();
    let encoding = options
        .encoding
        .clone()
        .unwrap_or_else(|| detect_encoding(bytes));
    let content = decode_content(bytes, &encoding)?;
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&content));
    debug!(%name, %encoding, %delimiter, "reading csv");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReadError::NoHeaders(name));
    }

    let mut dataset = TabularDataset::new(name, headers);
    for record in reader.records() {
        let record = record?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|cell| {
                let trimmed = cell.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();

        if row.iter().all(Option::is_none) {
            continue;
        }
        dataset.push_row(row);
    }

    Ok(CsvSource {
        dataset,
        encoding,
        delimiter,
    })
}

/// Write a dataset as delimited text. Absent cells become empty fields.
pub fn write_csv_file(
    data: &TabularDataset,
    path: impl AsRef<Path>,
    delimiter: char,
) -> IoResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .from_path(path.as_ref())?;

    writer.write_record(&data.headers)?;
    for row in &data.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    debug!(name = %data.name, rows = data.rows.len(), "wrote csv");
    Ok(())
}

fn delimiter_byte(delimiter: char) -> IoResult<u8> {
    u8::try_from(delimiter as u32).map_err(|_| ReadError::InvalidDelimiter(delimiter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_str(content: &str) -> CsvSource {
        read_csv_bytes("test", content.as_bytes(), &CsvReadOptions::default()).unwrap()
    }

    #[test]
    fn test_detect_delimiter_candidates() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_read_simple_csv() {
        let source = read_str("Code;Price\nA1;10,50\nA2;3,75\n");
        assert_eq!(source.delimiter, ';');
        assert_eq!(source.dataset.headers, vec!["Code", "Price"]);
        assert_eq!(source.dataset.rows.len(), 2);
        assert_eq!(source.dataset.cell(0, 1), Some("10,50"));
    }

    #[test]
    fn test_blank_rows_skipped_and_short_rows_padded() {
        let source = read_str("a;b;c\n1;2;3\n;;\n4;5\n");
        assert_eq!(source.dataset.rows.len(), 2);
        assert_eq!(source.dataset.rows[1].len(), 3);
        assert_eq!(source.dataset.cell(1, 2), None);
    }

    #[test]
    fn test_quoted_fields() {
        let source = read_str("name;note\n\"Alice\";\"semi;colon\"\n");
        assert_eq!(source.dataset.cell(0, 1), Some("semi;colon"));
    }

    #[test]
    fn test_empty_cells_become_none() {
        let source = read_str("a;b\n1;\n");
        assert_eq!(source.dataset.cell(0, 0), Some("1"));
        assert_eq!(source.dataset.cell(0, 1), None);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Preço" in ISO-8859-1.
        let mut bytes = b"nome\nPre".to_vec();
        bytes.push(0xE7);
        bytes.extend_from_slice(b"o\n");
        let source =
            read_csv_bytes("latin", &bytes, &CsvReadOptions::default()).unwrap();
        assert_eq!(source.dataset.cell(0, 0), Some("Preço"));
    }

    #[test]
    fn test_explicit_options_bypass_detection() {
        let options = CsvReadOptions {
            delimiter: Some(','),
            encoding: Some("utf-8".into()),
        };
        // The first line has more semicolons than commas; detection would pick ';'.
        let source = read_csv_bytes("t", b"a;x,b;y\n1,2\n", &options).unwrap();
        assert_eq!(source.delimiter, ',');
        assert_eq!(source.dataset.headers, vec!["a;x", "b;y"]);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let data = TabularDataset::with_rows(
            "out",
            vec!["Code".into(), "Qty".into()],
            vec![
                vec![Some("A1".into()), Some("3".into())],
                vec![Some("A2".into()), None],
            ],
        );

        let file = NamedTempFile::new().unwrap();
        write_csv_file(&data, file.path(), ';').unwrap();

        let options = CsvReadOptions {
            delimiter: Some(';'),
            ..CsvReadOptions::default()
        };
        let back = read_csv_file(file.path(), &options).unwrap();
        assert_eq!(back.dataset.headers, data.headers);
        assert_eq!(back.dataset.rows, data.rows);
    }

    #[test]
    fn test_file_not_found() {
        let result = read_csv_file("does-not-exist.csv", &CsvReadOptions::default());
        assert!(matches!(result, Err(ReadError::Io(_))));
    }

    #[test]
    fn test_headerless_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file).unwrap();
        let result = read_csv_file(file.path(), &CsvReadOptions::default());
        assert!(matches!(result, Err(ReadError::NoHeaders(_))));
    }
}
