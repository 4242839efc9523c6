//! Segment - Segmenter output, and the assembled segment table
//!
//! A segment is the zero-based slice of one stream for one boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Device, Measurement, Sample, SegmentId, StreamKey, SubjectId};

/// Zero-based sample sequence; the first sample's time is exactly 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub channels: Vec<String>,
    pub samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Span between first and last sample, seconds.
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}

/// Composite join key of an assembled row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentKey {
    pub segment_id: SegmentId,
    pub location: Option<String>,
}

impl SegmentKey {
    pub fn new(segment_id: SegmentId, location: Option<String>) -> Self {
        Self {
            segment_id,
            location,
        }
    }
}

/// Device + measurement pivot column (e.g. `smartwatch_accelerometer`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PivotColumn {
    pub device: Device,
    pub measurement: Measurement,
}

impl PivotColumn {
    pub fn new(device: Device, measurement: Measurement) -> Self {
        Self {
            device,
            measurement,
        }
    }
}

impl fmt::Display for PivotColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.device, self.measurement)
    }
}

/// One extracted segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    pub subject_id: SubjectId,
    pub device: Device,
    pub measurement: Measurement,
    pub location: Option<String>,
    /// `None` is an explicit null payload: the boundary is kept but carries
    /// no samples for this stream
    pub payload: Option<SampleSeries>,
}

impl Segment {
    /// Segment for `stream_key`, keyed to the boundary's id.
    pub fn for_stream(
        segment_id: SegmentId,
        stream_key: &StreamKey,
        payload: Option<SampleSeries>,
    ) -> Self {
        Self {
            segment_id,
            subject_id: stream_key.subject_id.clone(),
            device: stream_key.device,
            measurement: stream_key.measurement,
            location: stream_key.location.clone(),
            payload,
        }
    }

    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(self.segment_id.clone(), self.location.clone())
    }

    pub fn column(&self) -> PivotColumn {
        PivotColumn::new(self.device, self.measurement)
    }

    pub fn is_null(&self) -> bool {
        self.payload.is_none()
    }
}

/// Pivot cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "series", rename_all = "snake_case")]
pub enum Cell {
    /// Sliced series
    Series(SampleSeries),
    /// Segment recorded with a null payload
    Null,
    /// No segment for this column
    Absent,
}

impl Cell {
    pub fn series(&self) -> Option<&SampleSeries> {
        match self {
            Cell::Series(series) => Some(series),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Cell::Series(_))
    }
}

/// One assembled row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledRow {
    pub key: SegmentKey,
    pub subject_id: SubjectId,
    /// Label values, ordered as `AssembledTable::label_columns`
    pub labels: Vec<Option<String>>,
    /// Cells, ordered as `AssembledTable::pivot_columns`
    pub cells: Vec<Cell>,
}

/// Final segment table: one row per segment key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledTable {
    pub label_columns: Vec<String>,
    pub pivot_columns: Vec<PivotColumn>,
    /// Whether rows are split by sensor location
    pub has_location: bool,
    pub rows: Vec<AssembledRow>,
}

impl AssembledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn pivot_index(&self, column: PivotColumn) -> Option<usize> {
        self.pivot_columns.iter().position(|c| *c == column)
    }

    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.label_columns.iter().position(|c| c == name)
    }

    /// Rows of one segment id (one per location, or exactly one).
    pub fn rows_for(&self, segment_id: &str) -> impl Iterator<Item = &AssembledRow> {
        let segment_id = segment_id.to_string();
        self.rows
            .iter()
            .filter(move |row| row.key.segment_id.as_str() == segment_id)
    }

    /// Cell lookup by key and column.
    pub fn cell(&self, key: &SegmentKey, column: PivotColumn) -> Option<&Cell> {
        let idx = self.pivot_index(column)?;
        self.rows
            .iter()
            .find(|row| &row.key == key)
            .and_then(|row| row.cells.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_column_name() {
        let column = PivotColumn::new(Device::Smartwatch, Measurement::Accelerometer);
        assert_eq!(column.to_string(), "smartwatch_accelerometer");
        let patch = PivotColumn::new(Device::WearablePatch, Measurement::Emg);
        assert_eq!(patch.to_string(), "wearable_patch_emg");
    }

    #[test]
    fn test_segment_key_includes_location() {
        let id = SegmentId::generate();
        let a = SegmentKey::new(id.clone(), Some("left_ankle".into()));
        let b = SegmentKey::new(id.clone(), Some("right_ankle".into()));
        assert_ne!(a, b);
        assert_eq!(a, SegmentKey::new(id, Some("left_ankle".into())));
    }

    #[test]
    fn test_series_duration() {
        let series = SampleSeries {
            channels: vec!["x".into()],
            samples: vec![Sample::new(0.0, vec![1.0]), Sample::new(2.5, vec![1.0])],
        };
        assert_eq!(series.duration(), 2.5);
    }
}
