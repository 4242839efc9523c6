//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::SkipReason;
use observability::CurationMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Rows in the assembled segment table
    pub rows: usize,

    /// Number of sinks that received the output
    pub active_sinks: usize,

    /// Worker pool size used for file processing
    pub pool_size: usize,

    /// Run counters and segment statistics
    pub metrics: CurationMetricsAggregator,
}

impl PipelineStats {
    /// Files processed per second
    pub fn files_per_sec(&self) -> f64 {
        let files = self.metrics.run.files_loaded + self.metrics.run.files_failed;
        if self.duration.as_secs_f64() > 0.0 {
            files as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Boundaries and streams left out, all categories
    pub fn total_skipped(&self) -> usize {
        [
            SkipReason::MissingReference,
            SkipReason::InvalidBoundary,
            SkipReason::NoMatchingSamples,
        ]
        .into_iter()
        .map(|reason| self.metrics.run.skipped(reason))
        .sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Files/s: {:.2}", self.files_per_sec());
        println!("   Worker pool: {}", self.pool_size);
        println!("   Table rows: {}", self.rows);
        println!("   Active sinks: {}", self.active_sinks);
        println!("   Skipped (total): {}", self.total_skipped());
        println!();
        print!("{}", self.metrics.summary());
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RunSummary;

    #[test]
    fn test_rates_and_skips() {
        let mut metrics = CurationMetricsAggregator::new();
        metrics.update(&RunSummary {
            files_loaded: 8,
            files_failed: 2,
            streams_unaligned: 1,
            no_match_skips: 4,
            ..Default::default()
        });
        let stats = PipelineStats {
            duration: Duration::from_secs(5),
            metrics,
            ..Default::default()
        };
        assert!((stats.files_per_sec() - 2.0).abs() < 1e-10);
        assert_eq!(stats.total_skipped(), 5);
    }
}
