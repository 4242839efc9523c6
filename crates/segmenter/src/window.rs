//! Inclusive range selection and zero-basing.

use contracts::{Sample, SampleSeries};

/// Samples with `start <= time <= end`.
///
/// `samples` must be time-sorted; both ends are found by binary search.
pub fn select_range(samples: &[Sample], start: f64, end: f64) -> &[Sample] {
    if end < start {
        return &[];
    }
    let lo = samples.partition_point(|s| s.time < start);
    let hi = samples.partition_point(|s| s.time <= end);
    if lo >= hi {
        &[]
    } else {
        &samples[lo..hi]
    }
}

/// Copy `samples` with the first sample's time subtracted from every time.
///
/// Returns `None` for an empty slice.
pub fn zero_base(samples: &[Sample], channels: &[String]) -> Option<SampleSeries> {
    let origin = samples.first()?.time;
    Some(SampleSeries {
        channels: channels.to_vec(),
        samples: samples
            .iter()
            .map(|s| Sample::new(s.time - origin, s.values.clone()))
            .collect(),
    })
}
