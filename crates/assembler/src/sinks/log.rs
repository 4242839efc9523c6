//! LogSink - logs a run summary via tracing

use contracts::{ContractError, CurationOutput, DataSink};
use tracing::{info, instrument};

/// Sink that logs run summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, output: &CurationOutput) {
        let summary = &output.summary;
        info!(
            sink = %self.name,
            regime = output.regime.as_str(),
            boundaries = output.boundaries.len(),
            reserved_slots = output.boundaries.reserved().len(),
            references = output.time_references.as_ref().map_or(0, |t| t.len()),
            rows = output.segments.len(),
            segments = summary.segments_emitted,
            null_segments = summary.null_segments,
            "Curation output received"
        );
        for (rule, count) in summary.boundary_discards.iter() {
            info!(sink = %self.name, rule, count, "Boundaries discarded");
        }
        for (rule, count) in summary.reference_discards.iter() {
            info!(sink = %self.name, rule, count, "Reference pairings discarded");
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, output),
        fields(sink = %self.name, regime = output.regime.as_str())
    )]
    async fn write(&mut self, output: &CurationOutput) -> Result<(), ContractError> {
        self.log_summary(output);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_output;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let result = sink.write(&sample_output()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
