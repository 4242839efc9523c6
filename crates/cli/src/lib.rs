//! # Segment Curator
//!
//! Pipeline orchestration behind the `segment-curator` binary.
//!
//! A run resolves time references and boundaries once, fans sensor files out
//! to a bounded worker pool (align, then segment), assembles the segment
//! table and hands the result to the configured sinks.

pub mod error;
pub mod pipeline;

pub use error::CliError;
pub use pipeline::{CurationPipeline, PipelineConfig, PipelineStats};
