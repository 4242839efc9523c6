//! Row-oriented tables exchanged with collaborators.
//!
//! Clinical record sets come in as `Table`s with named columns; reference
//! tables go out the same way. Cells are optional strings; blank cells and
//! the `NaN`/`NA` spellings left behind by dataframe exports read as missing.

use serde::{Deserialize, Serialize};

use crate::ContractError;

const MISSING_SPELLINGS: &[&str] = &["nan", "na", "n/a", "null", "none", "nat"];

/// Named-column table of optional string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Human-readable table name, used in error messages
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The row must have exactly one cell per column.
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), ContractError> {
        if row.len() != self.columns.len() {
            return Err(ContractError::RowWidth {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Table::column_index`] but reports the table name when absent.
    pub fn require_column(&self, name: &str) -> Result<usize, ContractError> {
        self.column_index(name)
            .ok_or_else(|| ContractError::missing_column(&self.name, name))
    }

    /// Fail fast when any of `names` is absent.
    pub fn require_columns(&self, names: &[&str]) -> Result<(), ContractError> {
        for name in names {
            self.require_column(name)?;
        }
        Ok(())
    }

    /// Iterate rows as records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |row| Record { table: self, row })
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    row: &'a [Option<String>],
}

impl<'a> Record<'a> {
    /// Cell value by column name, `None` when the column is absent or the
    /// cell is empty / a missing-value spelling.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        let value = self.row.get(idx)?.as_deref()?.trim();
        if value.is_empty() || is_missing_spelling(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Raw cell value, without missing-value interpretation.
    pub fn raw(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        self.row.get(idx)?.as_deref()
    }
}

fn is_missing_spelling(value: &str) -> bool {
    MISSING_SPELLINGS
        .iter()
        .any(|spelling| value.eq_ignore_ascii_case(spelling))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("visits", ["subject_id", "visit", "start"]);
        table
            .push_row(vec![
                Some("1004".into()),
                Some("2 Weeks: Time 0".into()),
                Some(" 2017-06-01 10:00:00 ".into()),
            ])
            .unwrap();
        table
            .push_row(vec![Some("1005".into()), Some("NaN".into()), None])
            .unwrap();
        table
    }

    #[test]
    fn test_record_get_trims_and_detects_missing() {
        let table = sample();
        let records: Vec<_> = table.records().collect();
        assert_eq!(records[0].get("start"), Some("2017-06-01 10:00:00"));
        assert_eq!(records[1].get("visit"), None);
        assert_eq!(records[1].raw("visit"), Some("NaN"));
        assert_eq!(records[1].get("start"), None);
        assert_eq!(records[0].get("absent"), None);
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = sample();
        let err = table.push_row(vec![None]).unwrap_err();
        assert!(matches!(err, ContractError::RowWidth { expected: 3, got: 1 }));
    }

    #[test]
    fn test_require_column_names_table() {
        let table = sample();
        assert_eq!(table.require_column("visit").unwrap(), 1);
        let err = table.require_column("device").unwrap_err();
        assert!(err.to_string().contains("visits"));
        assert!(err.to_string().contains("device"));
    }
}
