//! DataSink trait - Assembler output interface
//!
//! A sink receives the finished curation artifacts of one run.

use crate::{AssembledTable, BoundaryRegime, BoundarySet, ContractError, RunSummary, TimeReferenceTable};

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct CurationOutput {
    pub regime: BoundaryRegime,
    /// Boundary reference table, keyed by segment id
    pub boundaries: BoundarySet,
    /// Present for device-offset cohorts
    pub time_references: Option<TimeReferenceTable>,
    pub segments: AssembledTable,
    pub summary: RunSummary,
}

/// Data output trait
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write curation output
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, output: &CurationOutput) -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    async fn close(&mut self) -> Result<(), ContractError>;
}
