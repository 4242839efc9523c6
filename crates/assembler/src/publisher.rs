//! Publisher - fans the run output out to every configured sink

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument};

use contracts::{CurationOutput, SinkConfig, SinkType};

use crate::error::AssemblerError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Create a SinkHandle from configuration
///
/// File sinks without a `base_path` param write into `output_dir`.
#[instrument(
    name = "publisher_create_sink_handle",
    skip(config, output_dir),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink_handle(
    config: &SinkConfig,
    output_dir: &Path,
) -> Result<SinkHandle, AssemblerError> {
    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::spawn(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params, output_dir)
                .map_err(|e| AssemblerError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink))
        }
    }
}

/// Sinks of one run
pub struct Publisher {
    handles: Vec<SinkHandle>,
}

impl Publisher {
    /// Start one worker per sink config
    pub fn from_configs(configs: &[SinkConfig], output_dir: &Path) -> Result<Self, AssemblerError> {
        let handles = configs
            .iter()
            .map(|config| create_sink_handle(config, output_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { handles })
    }

    /// Create a publisher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self { handles }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Hand `output` to every sink, then shut all sinks down.
    ///
    /// Every sink is drained even when another one fails; the first failure
    /// is returned. On success, per-sink metrics are returned.
    #[instrument(name = "publisher_publish", skip_all, fields(sinks = self.handles.len()))]
    pub async fn publish(
        self,
        output: CurationOutput,
    ) -> Result<Vec<(String, MetricsSnapshot)>, AssemblerError> {
        let output = Arc::new(output);
        let mut first_error = None;

        for handle in &self.handles {
            if let Err(e) = handle.send(Arc::clone(&output)).await {
                error!(sink = handle.name(), error = %e, "Failed to queue output");
                first_error.get_or_insert(e);
            }
        }

        let mut snapshots = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = Arc::clone(handle.metrics());
            if let Err(e) = handle.shutdown().await {
                first_error.get_or_insert(e);
            }
            snapshots.push((name, metrics.snapshot()));
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(sinks = snapshots.len(), "Output published");
                Ok(snapshots)
            }
        }
    }
}
