//! Ingestion error types

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion error
///
/// Fatal for the file (or table) being read; siblings are unaffected.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// File could not be opened or listed
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A configured column is absent from the header
    #[error("{path} has no column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// A cell could not be parsed
    #[error("failed to parse {path} line {line}: {message}")]
    ParseFailed {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// File name does not follow the source layout
    #[error("unexpected sensor file name '{name}': {message}")]
    FileName { name: String, message: String },
}

impl IngestionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn file_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileName {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
