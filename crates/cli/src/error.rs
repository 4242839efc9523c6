//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Sensor source directory missing or not a directory
    #[error("Sensor directory of source '{source_id}' not found: {path}")]
    SourceDir { source_id: String, path: PathBuf },

    /// A file worker panicked or was cancelled
    #[error("File worker failed: {message}")]
    Worker { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source_dir(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::SourceDir {
            source_id: source_id.into(),
            path: path.into(),
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}
