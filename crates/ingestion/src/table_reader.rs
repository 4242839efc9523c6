//! Delimited-text tables
//!
//! Clinical record sets and calibration sheets are read in full into
//! [`Table`]s. Short rows are padded with missing cells; empty cells read
//! as missing.

use std::fs::File;
use std::path::Path;

use contracts::{Table, TableKind, TableSource};
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Read a configured clinical table.
pub fn read_table_source(source: &TableSource, kind: TableKind) -> Result<Table> {
    read_table(&source.path, source.delimiter, kind.as_str())
}

/// Read a delimited text file with a header row.
pub fn read_table(path: &Path, delimiter: char, name: &str) -> Result<Table> {
    let file = File::open(path).map_err(|e| IngestionError::io(path, e))?;
    let mut reader = csv_reader(path, delimiter)?.from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| IngestionError::csv(path, e))?
        .iter()
        .map(clean_header)
        .collect();
    let width = columns.len();
    let mut table = Table::new(name, columns);

    for record in reader.records() {
        let record = record.map_err(|e| IngestionError::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        let mut row: Vec<Option<String>> = record
            .iter()
            .take(width)
            .map(|cell| {
                let cell = cell.trim();
                (!cell.is_empty()).then(|| cell.to_string())
            })
            .collect();
        row.resize(width, None);
        table.push_row(row).map_err(|e| IngestionError::ParseFailed {
            path: path.to_path_buf(),
            line,
            message: e.to_string(),
        })?;
    }

    debug!(table = name, path = %path.display(), rows = table.len(), "table loaded");
    Ok(table)
}

/// CSV reader configured for the exports: flexible widths, given delimiter.
pub(crate) fn csv_reader(path: &Path, delimiter: char) -> Result<csv::ReaderBuilder> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| IngestionError::ParseFailed {
            path: path.to_path_buf(),
            line: 0,
            message: format!("delimiter '{delimiter}' is not a single ASCII character"),
        })?;
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(delimiter).flexible(true).has_headers(true);
    Ok(builder)
}

/// Strip a UTF-8 byte order mark and surrounding whitespace.
pub(crate) fn clean_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_string()
}
