//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{CurationPipeline, PipelineConfig};
pub use stats::PipelineStats;
