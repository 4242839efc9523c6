//! Non-fatal outcome accounting
//!
//! Per-stream and per-boundary conditions are values, not errors. They are
//! tallied here and surfaced as a run summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a stream, boundary or pairing was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No time reference for the stream's (subject, device)
    MissingReference,
    /// Boundary failed its validity rule
    InvalidBoundary,
    /// Valid boundary, no samples in range for a given stream
    NoMatchingSamples,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MissingReference => "missing_reference",
            SkipReason::InvalidBoundary => "invalid_boundary",
            SkipReason::NoMatchingSamples => "no_matching_samples",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of discarded inputs keyed by a short rule name
/// (`missing_bound`, `non_positive_duration`, `before_recording_epoch`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardTally {
    counts: BTreeMap<String, usize>,
}

impl DiscardTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rule: &str) {
        *self.counts.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub fn add(&mut self, rule: &str, n: usize) {
        if n > 0 {
            *self.counts.entry(rule.to_string()).or_insert(0) += n;
        }
    }

    pub fn get(&self, rule: &str) -> usize {
        self.counts.get(rule).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &DiscardTally) {
        for (rule, n) in &other.counts {
            self.add(rule, *n);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Whole-run outcome counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub references_resolved: usize,
    pub reference_discards: DiscardTally,
    pub boundaries_resolved: usize,
    /// Unrecorded checkpoint slots kept as null rows
    #[serde(default)]
    pub reserved_slots: usize,
    pub boundary_discards: DiscardTally,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub streams_aligned: usize,
    pub streams_unaligned: usize,
    pub segments_emitted: usize,
    pub null_segments: usize,
    pub no_match_skips: usize,
}

impl RunSummary {
    /// Fold per-worker counters into this summary.
    pub fn merge(&mut self, other: &RunSummary) {
        self.references_resolved += other.references_resolved;
        self.reference_discards.merge(&other.reference_discards);
        self.boundaries_resolved += other.boundaries_resolved;
        self.reserved_slots += other.reserved_slots;
        self.boundary_discards.merge(&other.boundary_discards);
        self.files_loaded += other.files_loaded;
        self.files_failed += other.files_failed;
        self.streams_aligned += other.streams_aligned;
        self.streams_unaligned += other.streams_unaligned;
        self.segments_emitted += other.segments_emitted;
        self.null_segments += other.null_segments;
        self.no_match_skips += other.no_match_skips;
    }

    /// Count of one skip category.
    pub fn skipped(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::MissingReference => self.streams_unaligned,
            SkipReason::InvalidBoundary => self.boundary_discards.total(),
            SkipReason::NoMatchingSamples => self.no_match_skips,
        }
    }
}
