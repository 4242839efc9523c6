//! SinkHandle - runs a sink on its own worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{ContractError, CurationOutput, DataSink};

use crate::error::AssemblerError;
use crate::metrics::SinkMetrics;

/// Outputs queued per sink before `send` waits
const QUEUE_CAPACITY: usize = 4;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<Arc<CurationOutput>>,
    metrics: Arc<SinkMetrics>,
    /// Worker task handle, yields the first write error
    worker_handle: JoinHandle<Result<(), ContractError>>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: DataSink + Send + 'static>(sink: S) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle =
            tokio::spawn(async move { sink_worker(sink, rx, worker_metrics, worker_name).await });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue an output for the sink
    pub async fn send(&self, output: Arc<CurationOutput>) -> Result<(), AssemblerError> {
        self.tx
            .send(output)
            .await
            .map_err(|_| AssemblerError::WorkerLost {
                name: self.name.clone(),
            })
    }

    /// Close the queue and wait for the worker to flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> Result<(), AssemblerError> {
        // Drop sender to signal worker to stop
        drop(self.tx);
        let result = match self.worker_handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(AssemblerError::SinkFailed {
                name: self.name.clone(),
                source,
            }),
            Err(e) => {
                error!(sink = %self.name, error = ?e, "Worker task panicked");
                Err(AssemblerError::WorkerLost {
                    name: self.name.clone(),
                })
            }
        };
        debug!(sink = %self.name, "SinkHandle shutdown complete");
        result
    }
}

/// Worker task that consumes outputs and writes them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<Arc<CurationOutput>>,
    metrics: Arc<SinkMetrics>,
    name: String,
) -> Result<(), ContractError> {
    debug!(sink = %name, "Sink worker started");
    let mut first_error = None;

    while let Some(output) = rx.recv().await {
        match sink.write(&output).await {
            Ok(()) => metrics.record_write(output.segments.len()),
            Err(e) => {
                metrics.inc_failure_count();
                error!(sink = %name, error = %e, "Write failed");
                first_error.get_or_insert(e);
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
        first_error.get_or_insert(e);
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
        first_error.get_or_insert(e);
    }

    debug!(sink = %name, "Sink worker stopped");
    first_error.map_or(Ok(()), Err)
}
