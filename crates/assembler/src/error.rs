//! Assembler error types

use contracts::ContractError;
use thiserror::Error;

/// Assembler / sink error
#[derive(Debug, Error)]
pub enum AssemblerError {
    /// Sink creation failed
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// One or more sinks failed to persist the run output
    #[error("sink '{name}' failed")]
    SinkFailed {
        name: String,
        #[source]
        source: ContractError,
    },

    /// Sink worker stopped before acknowledging the output
    #[error("sink '{name}' worker stopped unexpectedly")]
    WorkerLost { name: String },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl AssemblerError {
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
