//! CurationBlueprint - Config Loader output
//!
//! Describes one curation run: cohort strategy, boundary regime, source
//! tables, sensor file sources, alignment rules and output routing. Replaces
//! process-wide toggles with an explicit value handed into the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

use crate::time::{year_start_seconds, DEFAULT_CENTER_RADIUS_S};
use crate::{Device, Measurement, PivotColumn};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CurationBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Source study population; selects alignment strategy
    pub cohort: Cohort,

    /// Boundary family to resolve and segment
    pub regime: BoundaryRegime,

    /// Clinical and calibration tables
    #[serde(default)]
    pub tables: TablesConfig,

    /// Clock alignment settings
    #[serde(default)]
    #[validate(nested)]
    pub alignment: AlignmentConfig,

    /// Whether checkpoint boundaries without data keep a row. Falls back to
    /// the cohort default when unset.
    #[serde(default)]
    pub center_point_policy: Option<CenterPointPolicy>,

    /// Raw sensor file sources
    #[validate(nested)]
    pub sources: Vec<SourceConfig>,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub output: OutputConfig,
}

impl CurationBlueprint {
    /// Center-point policy after applying the cohort default.
    pub fn effective_center_point_policy(&self) -> CenterPointPolicy {
        self.center_point_policy
            .unwrap_or_else(|| self.cohort.default_center_point_policy())
    }

    /// Distinct pivot columns in source declaration order.
    pub fn pivot_columns(&self) -> Vec<PivotColumn> {
        let mut columns = Vec::new();
        for source in &self.sources {
            let column = PivotColumn::new(source.device, source.measurement);
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Whether any source splits recordings by body location.
    pub fn has_locations(&self) -> bool {
        self.sources.iter().any(|s| s.location_column.is_some())
    }
}

/// Source study population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// In-clinic cohort; sensor files carry reference-clock wall time
    CisPd,
    /// Home cohort; sensor files carry device time, offset via calibration
    RealPd,
}

impl Cohort {
    pub fn alignment(self) -> AlignmentStrategy {
        match self {
            Cohort::CisPd => AlignmentStrategy::ReferenceNative,
            Cohort::RealPd => AlignmentStrategy::DeviceOffset,
        }
    }

    pub fn default_center_point_policy(self) -> CenterPointPolicy {
        match self {
            Cohort::CisPd => CenterPointPolicy::Drop,
            Cohort::RealPd => CenterPointPolicy::PreserveCardinality,
        }
    }

    pub fn supports(self, regime: BoundaryRegime) -> bool {
        regime.cohort() == self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cohort::CisPd => "cis_pd",
            Cohort::RealPd => "real_pd",
        }
    }
}

/// How a cohort's streams reach the reference clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStrategy {
    /// Timestamps already in reference time; parse and sort only
    ReferenceNative,
    /// Device timestamps shifted by the (subject, device) offset
    DeviceOffset,
}

/// Boundary families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRegime {
    /// Rating start → first following task, per (subject, visit)
    ClinicVisit,
    /// Scripted motor task start/stop
    MotorTask,
    /// Home on/off assessment start/stop
    HomeOnOff,
    /// Six diary checkpoints per subject per day
    DiaryCheckpoints,
    /// Self-reported symptom entries, one checkpoint per report time
    SymptomDiary,
}

impl BoundaryRegime {
    pub fn cohort(self) -> Cohort {
        match self {
            BoundaryRegime::ClinicVisit
            | BoundaryRegime::MotorTask
            | BoundaryRegime::SymptomDiary => Cohort::CisPd,
            BoundaryRegime::HomeOnOff | BoundaryRegime::DiaryCheckpoints => Cohort::RealPd,
        }
    }

    pub fn uses_center_points(self) -> bool {
        matches!(
            self,
            BoundaryRegime::DiaryCheckpoints | BoundaryRegime::SymptomDiary
        )
    }

    pub fn label_columns(self) -> &'static [&'static str] {
        match self {
            BoundaryRegime::ClinicVisit => &["visit", "participant_state"],
            BoundaryRegime::MotorTask => &["visit", "task", "task_code"],
            BoundaryRegime::HomeOnOff => &["date", "state"],
            BoundaryRegime::DiaryCheckpoints => &["date", "interval"],
            BoundaryRegime::SymptomDiary => {
                &["on_off", "tremor", "dyskinesia", "activity_intensity"]
            }
        }
    }

    /// Tables that must be configured for this regime.
    pub fn required_tables(self) -> &'static [TableKind] {
        match self {
            BoundaryRegime::ClinicVisit => &[TableKind::UpdrsPart3, TableKind::MotorTasks],
            BoundaryRegime::MotorTask => &[TableKind::MotorTasks],
            BoundaryRegime::SymptomDiary => &[TableKind::SymptomDiary],
            BoundaryRegime::HomeOnOff | BoundaryRegime::DiaryCheckpoints => {
                &[TableKind::HomeTimestamps, TableKind::VideoDeviceSync]
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryRegime::ClinicVisit => "clinic_visit",
            BoundaryRegime::MotorTask => "motor_task",
            BoundaryRegime::HomeOnOff => "home_on_off",
            BoundaryRegime::DiaryCheckpoints => "diary_checkpoints",
            BoundaryRegime::SymptomDiary => "symptom_diary",
        }
    }
}

/// Whether checkpoint boundaries without data keep a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterPointPolicy {
    /// Every checkpoint slot keeps a row; missing data becomes a null payload
    PreserveCardinality,
    /// Only checkpoints with matching samples produce segments
    Drop,
}

/// Named tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    UpdrsPart3,
    MotorTasks,
    HomeTimestamps,
    VideoDeviceSync,
    SymptomDiary,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::UpdrsPart3 => "updrs_part3",
            TableKind::MotorTasks => "motor_tasks",
            TableKind::HomeTimestamps => "home_timestamps",
            TableKind::VideoDeviceSync => "video_device_sync",
            TableKind::SymptomDiary => "symptom_diary",
        }
    }
}

/// Clinical and calibration tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Rating-scale part III records (visit start times)
    #[serde(default)]
    pub updrs_part3: Option<TableSource>,
    /// Motor task timestamps and scores
    #[serde(default)]
    pub motor_tasks: Option<TableSource>,
    /// Home export: on/off assessment times and diary checkpoints
    #[serde(default)]
    pub home_timestamps: Option<TableSource>,
    /// Paired video/device clock observations
    #[serde(default)]
    pub video_device_sync: Option<TableSource>,
    /// At-home symptom reports (long format, one measurement per row)
    #[serde(default)]
    pub symptom_diary: Option<TableSource>,
}

impl TablesConfig {
    pub fn get(&self, kind: TableKind) -> Option<&TableSource> {
        match kind {
            TableKind::UpdrsPart3 => self.updrs_part3.as_ref(),
            TableKind::MotorTasks => self.motor_tasks.as_ref(),
            TableKind::HomeTimestamps => self.home_timestamps.as_ref(),
            TableKind::VideoDeviceSync => self.video_device_sync.as_ref(),
            TableKind::SymptomDiary => self.symptom_diary.as_ref(),
        }
    }
}

/// Delimited text table on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl TableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Clock alignment settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlignmentConfig {
    /// Half-width of checkpoint windows, seconds
    #[serde(default = "default_center_radius")]
    #[validate(range(min = 0.0, max = 86400.0))]
    pub center_radius_s: f64,

    /// Calendar sanity rule for device clocks
    #[serde(default)]
    #[validate(nested)]
    pub recording_epoch: RecordingEpochRule,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            center_radius_s: default_center_radius(),
            recording_epoch: RecordingEpochRule::default(),
        }
    }
}

fn default_center_radius() -> f64 {
    DEFAULT_CENTER_RADIUS_S
}

/// Device recordings stamped before January 1st of `min_year` are treated
/// as recording errors and their calibration pairs are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RecordingEpochRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_year")]
    #[validate(range(min = 1970, max = 2100))]
    pub min_year: i32,
}

impl Default for RecordingEpochRule {
    fn default() -> Self {
        Self {
            enabled: true,
            min_year: default_min_year(),
        }
    }
}

impl RecordingEpochRule {
    /// Name used in discard tallies and logs.
    pub const NAME: &'static str = "before_recording_epoch";

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Earliest admissible device time, seconds.
    pub fn threshold_seconds(&self) -> Option<f64> {
        if self.enabled {
            year_start_seconds(self.min_year)
        } else {
            None
        }
    }

    /// Whether a device timestamp passes the rule.
    pub fn admits(&self, device_time: f64) -> bool {
        self.threshold_seconds()
            .map_or(true, |threshold| device_time >= threshold)
    }
}

fn default_true() -> bool {
    true
}

fn default_min_year() -> i32 {
    2017
}

/// One directory of raw sensor files for a (device, measurement)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    /// Unique source identifier
    #[validate(length(min = 1))]
    pub id: String,

    /// Directory containing the files
    pub dir: PathBuf,

    /// File name prefix (e.g. `Table9A`)
    #[validate(length(min = 1))]
    pub prefix: String,

    pub device: Device,

    pub measurement: Measurement,

    #[serde(default)]
    pub file_layout: FileLayout,

    /// Timestamp / offset column
    #[serde(default = "default_time_column")]
    pub time_column: String,

    #[serde(default)]
    pub time_axis: TimeAxis,

    /// Column holding the body location for multi-site recordings
    #[serde(default)]
    pub location_column: Option<String>,

    /// Channel columns, in output order
    #[validate(length(min = 1))]
    pub channels: Vec<String>,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_time_column() -> String {
    "Timestamp".to_string()
}

/// File naming scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileLayout {
    /// `<prefix>_<subject>.csv`
    #[default]
    Subject,
    /// `<prefix>_<subject>_<YYYY-MM>.csv`
    SubjectYearMonth,
}

/// Unit of the raw time column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxis {
    /// Absolute datetime text
    #[default]
    Datetime,
    /// Numeric seconds
    Seconds,
    /// Integer milliseconds (device-relative offsets)
    Milliseconds,
}

/// Output routing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Upper bound on concurrently processed sensor files
    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1, max = 64))]
    pub pool_size: usize,

    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            pool_size: default_pool_size(),
            sinks: default_sinks(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_pool_size() -> usize {
    4
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig {
        name: "log".to_string(),
        sink_type: SinkType::Log,
        params: HashMap::new(),
    }]
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Sink-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    Log,
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_cohort_mapping() {
        assert!(Cohort::CisPd.supports(BoundaryRegime::ClinicVisit));
        assert!(Cohort::CisPd.supports(BoundaryRegime::MotorTask));
        assert!(Cohort::CisPd.supports(BoundaryRegime::SymptomDiary));
        assert!(!Cohort::RealPd.supports(BoundaryRegime::SymptomDiary));
        assert!(Cohort::RealPd.supports(BoundaryRegime::DiaryCheckpoints));
        assert!(!Cohort::RealPd.supports(BoundaryRegime::ClinicVisit));
    }

    #[test]
    fn test_cohort_strategies() {
        assert_eq!(
            Cohort::CisPd.alignment(),
            AlignmentStrategy::ReferenceNative
        );
        assert_eq!(Cohort::RealPd.alignment(), AlignmentStrategy::DeviceOffset);
        assert_eq!(
            Cohort::RealPd.default_center_point_policy(),
            CenterPointPolicy::PreserveCardinality
        );
        assert_eq!(
            Cohort::CisPd.default_center_point_policy(),
            CenterPointPolicy::Drop
        );
        assert!(BoundaryRegime::SymptomDiary.uses_center_points());
    }

    #[test]
    fn test_recording_epoch_rule() {
        let rule = RecordingEpochRule::default();
        let before = year_start_seconds(2016).unwrap();
        let after = year_start_seconds(2018).unwrap();
        assert!(!rule.admits(before));
        assert!(rule.admits(after));
        assert!(!rule.admits(40.0));
        assert!(RecordingEpochRule::disabled().admits(40.0));
    }

    #[test]
    fn test_alignment_defaults() {
        let alignment = AlignmentConfig::default();
        assert_eq!(alignment.center_radius_s, 600.0);
        assert!(alignment.recording_epoch.enabled);
        assert_eq!(alignment.recording_epoch.min_year, 2017);
    }
}
