//! Segmenter implementation.

use contracts::{
    Boundary, BoundaryWindow, CenterPointPolicy, CurationBlueprint, Segment, SensorStream,
    SkipReason,
};
use tracing::{debug, instrument, trace};

use crate::window::{select_range, zero_base};

/// Segmenter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    /// Half-width of checkpoint windows, seconds
    pub center_radius_s: f64,
    /// Whether checkpoints without samples keep a null-payload segment
    pub center_point_policy: CenterPointPolicy,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            center_radius_s: contracts::time::DEFAULT_CENTER_RADIUS_S,
            center_point_policy: CenterPointPolicy::Drop,
        }
    }
}

impl SegmenterConfig {
    pub fn from_blueprint(blueprint: &CurationBlueprint) -> Self {
        Self {
            center_radius_s: blueprint.alignment.center_radius_s,
            center_point_policy: blueprint.effective_center_point_policy(),
        }
    }
}

/// Segments cut from one stream
#[derive(Debug, Clone, Default)]
pub struct SegmentBatch {
    pub segments: Vec<Segment>,
    /// Boundaries skipped for lack of samples
    pub no_match: usize,
    /// Segments recorded with a null payload
    pub null_payloads: usize,
}

impl SegmentBatch {
    pub fn extend(&mut self, other: SegmentBatch) {
        self.segments.extend(other.segments);
        self.no_match += other.no_match;
        self.null_payloads += other.null_payloads;
    }

    /// Segments carrying samples.
    pub fn emitted(&self) -> usize {
        self.segments.len() - self.null_payloads
    }
}

/// What a single boundary yields against a stream
enum Cut {
    Series(Segment),
    Null(Segment),
    Skip(SkipReason),
}

/// Cuts aligned streams against resolved boundaries
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Cut `stream` against every boundary of its subject in one pass.
    ///
    /// Boundaries of other subjects are ignored. Intervals with no samples
    /// in range are skipped. Center points follow the configured policy:
    /// under [`CenterPointPolicy::PreserveCardinality`] an unmatched
    /// checkpoint yields a null-payload segment.
    #[instrument(
        name = "segmenter_segment",
        skip_all,
        fields(
            subject_id = %stream.key.subject_id,
            device = %stream.key.device,
            measurement = %stream.key.measurement,
            location = ?stream.key.location,
        )
    )]
    pub fn segment<'a, I>(&self, stream: &SensorStream, boundaries: I) -> SegmentBatch
    where
        I: IntoIterator<Item = &'a Boundary>,
    {
        let mut batch = SegmentBatch::default();
        debug_assert!(stream.is_time_ordered(), "streams are sorted on construction");

        for boundary in boundaries
            .into_iter()
            .filter(|b| b.subject_id == stream.key.subject_id)
        {
            match self.cut(stream, boundary) {
                Cut::Series(segment) => {
                    if let Some(series) = &segment.payload {
                        metrics::histogram!("curation_segment_samples").record(series.len() as f64);
                    }
                    batch.segments.push(segment);
                }
                Cut::Null(segment) => {
                    batch.null_payloads += 1;
                    batch.segments.push(segment);
                }
                Cut::Skip(reason) => {
                    trace!(segment_id = %boundary.segment_id, %reason, "boundary skipped");
                    batch.no_match += 1;
                }
            }
        }

        self.record_batch_metrics(stream, &batch);
        debug!(
            segments = batch.emitted(),
            null_payloads = batch.null_payloads,
            no_match = batch.no_match,
            "stream segmented"
        );
        batch
    }

    fn cut(&self, stream: &SensorStream, boundary: &Boundary) -> Cut {
        let keeps_null = matches!(boundary.window, BoundaryWindow::CenterPoint { .. })
            && self.config.center_point_policy == CenterPointPolicy::PreserveCardinality;
        let (start, end) = boundary.window.range(self.config.center_radius_s);

        let selected = select_range(stream.samples(), start, end);
        match zero_base(selected, &stream.channels) {
            Some(series) => Cut::Series(Segment::for_stream(
                boundary.segment_id.clone(),
                &stream.key,
                Some(series),
            )),
            None if keeps_null => Cut::Null(Segment::for_stream(
                boundary.segment_id.clone(),
                &stream.key,
                None,
            )),
            None => Cut::Skip(SkipReason::NoMatchingSamples),
        }
    }

    fn record_batch_metrics(&self, stream: &SensorStream, batch: &SegmentBatch) {
        let device = stream.key.device.as_str();
        let measurement = stream.key.measurement.as_str();
        metrics::counter!(
            "curation_segments_emitted_total",
            "device" => device,
            "measurement" => measurement
        )
        .increment(batch.emitted() as u64);
        if batch.null_payloads > 0 {
            metrics::counter!("curation_null_segments_total", "device" => device)
                .increment(batch.null_payloads as u64);
        }
        if batch.no_match > 0 {
            metrics::counter!("curation_no_match_total", "device" => device)
                .increment(batch.no_match as u64);
        }
    }
}
