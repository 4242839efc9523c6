//! # Assembler
//!
//! Final stage of the curation pipeline.
//!
//! Responsibilities:
//! - Pivot per-file `Segment`s into one `AssembledTable` keyed by segment id
//! - Keep every boundary's row, marking columns without data as absent
//! - Fan the run output out to the configured sinks (log, file)

mod assembler;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod publisher;
pub mod sinks;

pub use assembler::SegmentAssembler;
pub use contracts::{CurationOutput, DataSink};
pub use error::AssemblerError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use publisher::{Publisher, create_sink_handle};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
