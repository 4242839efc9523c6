//! Curation run metrics
//!
//! Prometheus-facing recorders plus an in-process aggregator that turns a
//! run's counters into a printable summary.

use std::collections::BTreeMap;

use contracts::{RunSummary, Segment, SkipReason, TimeReferenceTable};
use metrics::{counter, gauge, histogram};

/// Publish the final counters of a run as gauges.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_run_summary;
///
/// let summary = pipeline.run().await?;
/// record_run_summary(&summary);
/// ```
pub fn record_run_summary(summary: &RunSummary) {
    gauge!("curation_run_references").set(summary.references_resolved as f64);
    gauge!("curation_run_boundaries").set(summary.boundaries_resolved as f64);
    gauge!("curation_run_reserved_slots").set(summary.reserved_slots as f64);
    gauge!("curation_run_files_loaded").set(summary.files_loaded as f64);
    gauge!("curation_run_files_failed").set(summary.files_failed as f64);
    gauge!("curation_run_segments").set(summary.segments_emitted as f64);
    gauge!("curation_run_null_segments").set(summary.null_segments as f64);

    for reason in [
        SkipReason::MissingReference,
        SkipReason::InvalidBoundary,
        SkipReason::NoMatchingSamples,
    ] {
        gauge!("curation_run_skipped", "reason" => reason.as_str())
            .set(summary.skipped(reason) as f64);
    }
}

/// Count one processed sensor file
pub fn record_file_processed(source_id: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "curation_files_processed_total",
        "source" => source_id.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Wall-clock duration of a pipeline stage
pub fn record_stage_duration_ms(stage: &'static str, elapsed_ms: f64) {
    histogram!("curation_stage_duration_ms", "stage" => stage).record(elapsed_ms);
}

/// Aggregates run counters and segment statistics in memory
#[derive(Debug, Clone, Default)]
pub struct CurationMetricsAggregator {
    /// Merged counters of every worker
    pub run: RunSummary,

    /// Samples per non-empty segment
    pub samples_per_segment: RunningStats,

    /// Span of each non-empty segment, seconds
    pub segment_duration_s: RunningStats,

    /// Resolved clock offsets, seconds
    pub offset_s: RunningStats,

    /// Non-empty segments per pivot column
    pub segments_per_column: BTreeMap<String, u64>,
}

impl CurationMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a worker's counters in
    pub fn update(&mut self, summary: &RunSummary) {
        self.run.merge(summary);
    }

    pub fn observe_segment(&mut self, segment: &Segment) {
        let Some(series) = &segment.payload else {
            return;
        };
        self.samples_per_segment.push(series.len() as f64);
        self.segment_duration_s.push(series.duration());
        *self
            .segments_per_column
            .entry(segment.column().to_string())
            .or_insert(0) += 1;
    }

    pub fn observe_references(&mut self, references: &TimeReferenceTable) {
        for reference in references.sorted() {
            self.offset_s.push(reference.offset_s);
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            run: self.run.clone(),
            samples_per_segment: StatsSummary::from(&self.samples_per_segment),
            segment_duration_s: StatsSummary::from(&self.segment_duration_s),
            offset_s: StatsSummary::from(&self.offset_s),
            segments_per_column: self.segments_per_column.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Printable run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub run: RunSummary,
    pub samples_per_segment: StatsSummary,
    pub segment_duration_s: StatsSummary,
    pub offset_s: StatsSummary,
    pub segments_per_column: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let run = &self.run;
        writeln!(f, "=== Curation Summary ===")?;
        writeln!(f, "Time references: {}", run.references_resolved)?;
        writeln!(
            f,
            "Boundaries: {} (reserved slots: {})",
            run.boundaries_resolved, run.reserved_slots
        )?;
        writeln!(
            f,
            "Files loaded: {} (failed: {})",
            run.files_loaded, run.files_failed
        )?;
        writeln!(
            f,
            "Streams aligned: {} (unaligned: {})",
            run.streams_aligned, run.streams_unaligned
        )?;
        writeln!(
            f,
            "Segments: {} (null payloads: {})",
            run.segments_emitted, run.null_segments
        )?;
        writeln!(f, "Skipped:")?;
        for reason in [
            SkipReason::MissingReference,
            SkipReason::InvalidBoundary,
            SkipReason::NoMatchingSamples,
        ] {
            writeln!(f, "  {}: {}", reason, run.skipped(reason))?;
        }
        for (rule, count) in run.boundary_discards.iter() {
            writeln!(f, "  boundary/{}: {}", rule, count)?;
        }
        for (rule, count) in run.reference_discards.iter() {
            writeln!(f, "  reference/{}: {}", rule, count)?;
        }
        writeln!(f, "Samples per segment: {}", self.samples_per_segment)?;
        writeln!(f, "Segment duration (s): {}", self.segment_duration_s)?;
        writeln!(f, "Clock offset (s): {}", self.offset_s)?;

        if !self.segments_per_column.is_empty() {
            writeln!(f, "Segments per column:")?;
            for (column, count) in &self.segments_per_column {
                writeln!(f, "  {}: {}", column, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        Device, Measurement, ReferenceKey, Sample, SampleSeries, StreamKey, TimeReference,
    };

    fn segment(samples: usize) -> Segment {
        let key = StreamKey {
            subject_id: "1004".into(),
            device: Device::Smartwatch,
            measurement: Measurement::Accelerometer,
            location: None,
        };
        let payload = (samples > 0).then(|| SampleSeries {
            channels: vec!["x".into()],
            samples: (0..samples)
                .map(|i| Sample::new(i as f64 * 0.5, vec![0.0]))
                .collect(),
        });
        Segment::for_stream("seg".into(), &key, payload)
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CurationMetricsAggregator::new();
        let worker = RunSummary {
            files_loaded: 1,
            segments_emitted: 2,
            streams_unaligned: 1,
            ..Default::default()
        };
        aggregator.update(&worker);
        aggregator.update(&worker);
        aggregator.observe_segment(&segment(5));
        aggregator.observe_segment(&segment(0));

        let mut references = TimeReferenceTable::new();
        references.insert(TimeReference::from_pair(
            ReferenceKey::new("hbv012".into(), Device::Smartwatch),
            100.0,
            40.0,
        ));
        aggregator.observe_references(&references);

        assert_eq!(aggregator.run.files_loaded, 2);
        assert_eq!(aggregator.run.skipped(SkipReason::MissingReference), 2);
        assert_eq!(aggregator.samples_per_segment.count(), 1, "null payloads ignored");
        assert!((aggregator.segment_duration_s.max() - 2.0).abs() < 1e-10);
        assert_eq!(
            aggregator.segments_per_column.get("smartwatch_accelerometer"),
            Some(&1)
        );
        assert!((aggregator.offset_s.mean() - 60.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CurationMetricsAggregator::new();
        let mut run = RunSummary {
            files_loaded: 12,
            no_match_skips: 3,
            ..Default::default()
        };
        run.boundary_discards.add("non_positive_duration", 2);
        aggregator.update(&run);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Files loaded: 12"));
        assert!(output.contains("no_matching_samples: 3"));
        assert!(output.contains("invalid_boundary: 2"));
        assert!(output.contains("boundary/non_positive_duration: 2"));
        assert!(output.contains("Clock offset (s): N/A"));
    }
}
