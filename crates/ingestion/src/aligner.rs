//! Stream Aligner
//!
//! Brings the streams of one raw file onto the reference clock. Reference
//! native cohorts only need parsing and sorting; device-clock cohorts are
//! shifted by the (subject, device) offset. A missing offset is a value,
//! [`AlignOutcome::NotAlignable`], never an error.

use contracts::{AlignmentStrategy, Device, SensorStream, SourceConfig, SubjectId, TimeReferenceTable};
use tracing::{debug, instrument, warn};

use crate::discovery::SensorFile;
use crate::error::Result;
use crate::reader::SensorFileReader;

/// Result of aligning one file
#[derive(Debug, Clone)]
pub enum AlignOutcome {
    /// Streams on the reference clock, time-sorted
    Aligned(Vec<SensorStream>),
    /// No time reference for the file's (subject, device)
    NotAlignable { subject_id: SubjectId, device: Device },
}

impl AlignOutcome {
    /// Aligned streams; empty when not alignable.
    pub fn streams(&self) -> &[SensorStream] {
        match self {
            AlignOutcome::Aligned(streams) => streams,
            AlignOutcome::NotAlignable { .. } => &[],
        }
    }

    pub fn is_aligned(&self) -> bool {
        matches!(self, AlignOutcome::Aligned(_))
    }
}

/// Aligns raw files under one strategy
#[derive(Debug, Clone, Copy)]
pub struct StreamAligner<'a> {
    strategy: AlignmentStrategy,
    references: Option<&'a TimeReferenceTable>,
}

impl<'a> StreamAligner<'a> {
    /// Aligner for files already stamped with reference-clock time.
    pub fn reference_native() -> Self {
        Self {
            strategy: AlignmentStrategy::ReferenceNative,
            references: None,
        }
    }

    /// Aligner shifting device time by per-(subject, device) offsets.
    pub fn device_offset(references: &'a TimeReferenceTable) -> Self {
        Self {
            strategy: AlignmentStrategy::DeviceOffset,
            references: Some(references),
        }
    }

    pub fn strategy(&self) -> AlignmentStrategy {
        self.strategy
    }

    /// Load `file` and express its streams on the reference clock.
    ///
    /// For device-offset alignment the reference is looked up before the
    /// file is opened; without one nothing is read.
    #[instrument(skip_all, fields(source = %source.id, subject_id = %file.name.subject_id))]
    pub fn align(&self, source: &SourceConfig, file: &SensorFile) -> Result<AlignOutcome> {
        let reader = SensorFileReader::new(source);
        match self.strategy {
            AlignmentStrategy::ReferenceNative => {
                let streams = reader.read(file)?;
                debug!(streams = streams.len(), "reference-native streams loaded");
                Ok(AlignOutcome::Aligned(streams))
            }
            AlignmentStrategy::DeviceOffset => {
                let subject_id = &file.name.subject_id;
                let reference = self
                    .references
                    .and_then(|table| table.get(subject_id, source.device));
                let Some(reference) = reference else {
                    warn!(device = %source.device, "no time reference; stream not alignable");
                    metrics::counter!("curation_streams_unaligned_total", "device" => source.device.as_str())
                        .increment(1);
                    return Ok(AlignOutcome::NotAlignable {
                        subject_id: subject_id.clone(),
                        device: source.device,
                    });
                };
                let mut streams = reader.read(file)?;
                for stream in &mut streams {
                    stream.shift(reference.offset_s);
                }
                debug!(
                    streams = streams.len(),
                    offset_s = reference.offset_s,
                    "device streams shifted to reference clock"
                );
                Ok(AlignOutcome::Aligned(streams))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SensorFileName;
    use contracts::{FileLayout, Measurement, ReferenceKey, TimeAxis, TimeReference};

    fn source(dir: &std::path::Path) -> SourceConfig {
        SourceConfig {
            id: "watch_accel".into(),
            dir: dir.to_path_buf(),
            prefix: "watch_accel".into(),
            device: Device::Smartwatch,
            measurement: Measurement::Accelerometer,
            file_layout: FileLayout::Subject,
            time_column: "Timestamp".into(),
            time_axis: TimeAxis::Seconds,
            location_column: None,
            channels: vec!["x".into()],
            delimiter: ',',
        }
    }

    fn file(dir: &std::path::Path, subject: &str) -> SensorFile {
        let path = dir.join(format!("watch_accel_{subject}.csv"));
        std::fs::write(&path, "Timestamp,x\n46,2\n45,1\n").unwrap();
        SensorFile {
            path,
            name: SensorFileName {
                subject_id: subject.into(),
                year_month: None,
            },
        }
    }

    #[test]
    fn test_device_offset_shifts_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut references = TimeReferenceTable::new();
        references.insert(TimeReference::from_pair(
            ReferenceKey::new("hbv012".into(), Device::Smartwatch),
            100.0,
            40.0,
        ));
        let aligner = StreamAligner::device_offset(&references);
        let outcome = aligner.align(&source(dir.path()), &file(dir.path(), "hbv012")).unwrap();
        assert!(outcome.is_aligned());
        let stream = &outcome.streams()[0];
        assert_eq!(stream.samples()[0].time, 105.0);
        assert_eq!(stream.samples()[1].time, 106.0);
        assert!(stream.is_time_ordered());
    }

    #[test]
    fn test_missing_reference_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let references = TimeReferenceTable::new();
        let aligner = StreamAligner::device_offset(&references);
        let outcome = aligner.align(&source(dir.path()), &file(dir.path(), "hbv013")).unwrap();
        assert!(!outcome.is_aligned());
        assert!(outcome.streams().is_empty());
        assert!(matches!(
            outcome,
            AlignOutcome::NotAlignable { device: Device::Smartwatch, .. }
        ));
    }

    #[test]
    fn test_reference_native_only_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = StreamAligner::reference_native()
            .align(&source(dir.path()), &file(dir.path(), "1004"))
            .unwrap();
        let stream = &outcome.streams()[0];
        assert_eq!(stream.time_range(), Some((45.0, 46.0)));
    }
}
