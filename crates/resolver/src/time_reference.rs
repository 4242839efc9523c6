//! Time-Reference Resolver
//!
//! Turns the paired-clock calibration sheet into one linear offset per
//! (subject, device). Each row pairs a reference (video) timestamp with the
//! device timestamp of the same physical event.

use std::collections::BTreeMap;

use contracts::time::parse_instant;
use contracts::{
    Device, DiscardTally, RecordingEpochRule, ReferenceKey, SubjectId, Table, TimeReference,
    TimeReferenceTable,
};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Calibration sheet columns
pub mod columns {
    pub const SUBJECT: &str = "pat_id";
    pub const DEVICE: &str = "device";
    pub const REFERENCE_TIME: &str = "video_time";
    pub const DEVICE_TIME: &str = "device_time";
}

/// Discard rule names
pub mod rules {
    pub const MISSING_SUBJECT: &str = "missing_subject";
    pub const UNKNOWN_DEVICE: &str = "unknown_device";
    pub const MISSING_OBSERVATION: &str = "missing_observation";
    pub const AMBIGUOUS_KEY: &str = "ambiguous_key";
}

/// Resolved references plus what was left out
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolution {
    pub references: TimeReferenceTable,
    pub discards: DiscardTally,
}

/// Builds the [`TimeReferenceTable`] of a run
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeReferenceResolver {
    epoch_rule: RecordingEpochRule,
}

impl TimeReferenceResolver {
    pub fn new(epoch_rule: RecordingEpochRule) -> Self {
        Self { epoch_rule }
    }

    /// Resolve offsets from the calibration sheet.
    ///
    /// Rows missing either observation, naming an unknown device, or failing
    /// the recording-epoch rule are discarded. A key left with zero or several
    /// valid pairs gets no entry.
    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn resolve(&self, table: &Table) -> Result<ReferenceResolution> {
        table.require_columns(&[
            columns::SUBJECT,
            columns::DEVICE,
            columns::REFERENCE_TIME,
            columns::DEVICE_TIME,
        ])?;

        let mut discards = DiscardTally::new();
        let mut pairs: BTreeMap<ReferenceKey, Vec<(f64, f64)>> = BTreeMap::new();

        for record in table.records() {
            let Some(subject_id) = record.get(columns::SUBJECT).and_then(SubjectId::parse) else {
                discards.record(rules::MISSING_SUBJECT);
                continue;
            };
            let Some(device) = record
                .get(columns::DEVICE)
                .and_then(|raw| raw.parse::<Device>().ok())
            else {
                discards.record(rules::UNKNOWN_DEVICE);
                continue;
            };
            let reference_time = record.get(columns::REFERENCE_TIME).and_then(parse_instant);
            let device_time = record.get(columns::DEVICE_TIME).and_then(parse_instant);
            let (Some(reference_time), Some(device_time)) = (reference_time, device_time) else {
                discards.record(rules::MISSING_OBSERVATION);
                continue;
            };
            if !self.epoch_rule.admits(device_time) {
                debug!(
                    subject_id = %subject_id,
                    device = %device,
                    device_time,
                    min_year = self.epoch_rule.min_year,
                    "device clock predates recording epoch"
                );
                discards.record(RecordingEpochRule::NAME);
                continue;
            }
            pairs
                .entry(ReferenceKey::new(subject_id, device))
                .or_default()
                .push((reference_time, device_time));
        }

        let mut references = TimeReferenceTable::new();
        for (key, observations) in pairs {
            match observations.as_slice() {
                [(reference_time, device_time)] => {
                    references.insert(TimeReference::from_pair(key, *reference_time, *device_time));
                }
                _ => {
                    debug!(
                        subject_id = %key.subject_id,
                        device = %key.device,
                        pairs = observations.len(),
                        "ambiguous calibration, no reference"
                    );
                    discards.add(rules::AMBIGUOUS_KEY, observations.len());
                }
            }
        }

        metrics::gauge!("curation_time_references").set(references.len() as f64);
        for (rule, n) in discards.iter() {
            metrics::counter!("curation_reference_discards_total", "rule" => rule.to_string())
                .increment(n as u64);
        }
        info!(
            references = references.len(),
            discarded = discards.total(),
            "time references resolved"
        );
        Ok(ReferenceResolution {
            references,
            discards,
        })
    }
}
