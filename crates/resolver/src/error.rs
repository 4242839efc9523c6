//! Resolver error types

use contracts::ContractError;
use thiserror::Error;

/// Resolver error
///
/// Only schema problems are errors. Bad rows are discarded and tallied.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Source table does not have the expected shape
    #[error(transparent)]
    Schema(#[from] ContractError),

    /// Regime needs a table that was not supplied
    #[error("regime '{regime}' requires table '{table}'")]
    MissingTable {
        regime: &'static str,
        table: &'static str,
    },
}

/// Resolver Result type alias
pub type Result<T> = std::result::Result<T, ResolveError>;
