//! BoundarySpec - Boundary Resolver output
//!
//! A boundary is a labelled time window in reference-clock seconds, either an
//! explicit interval or a checkpoint expanded by a fixed radius at use time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::time::format_seconds;
use crate::{BoundaryRegime, ContractError, SegmentId, SubjectId, Table};

/// Medication state of a home on/off assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationState {
    On,
    Off,
}

impl MedicationState {
    pub fn as_str(self) -> &'static str {
        match self {
            MedicationState::On => "on",
            MedicationState::Off => "off",
        }
    }
}

impl fmt::Display for MedicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BoundaryWindow {
    /// Explicit `[start, end]`; `end > start` holds for every resolved interval
    Interval { start: f64, end: f64 },
    /// Checkpoint expanded to `[center - r, center + r]`
    CenterPoint { center: f64 },
}

impl BoundaryWindow {
    /// Inclusive range in reference seconds.
    pub fn range(&self, center_radius_s: f64) -> (f64, f64) {
        match *self {
            BoundaryWindow::Interval { start, end } => (start, end),
            BoundaryWindow::CenterPoint { center } => {
                (center - center_radius_s, center + center_radius_s)
            }
        }
    }

    /// Start of an interval or the checkpoint itself.
    pub fn anchor(&self) -> f64 {
        match *self {
            BoundaryWindow::Interval { start, .. } => start,
            BoundaryWindow::CenterPoint { center } => center,
        }
    }
}

/// Clinical label carried by a boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryLabel {
    /// In-clinic rating period: rating start until the first following task
    ClinicVisit {
        visit: String,
        participant_state: Option<String>,
    },
    /// One scripted motor task
    MotorTask {
        visit: String,
        task: String,
        task_code: Option<String>,
    },
    /// Home on/off assessment
    HomeState {
        date: NaiveDate,
        state: MedicationState,
    },
    /// Diary checkpoint `index` (1..=6) of a given day
    DiaryCheckpoint { date: NaiveDate, index: u8 },
    /// Self-reported symptom entry; scores are `None` when not reported
    SymptomReport {
        on_off: Option<String>,
        tremor: Option<String>,
        dyskinesia: Option<String>,
        activity_intensity: Option<String>,
    },
}

impl BoundaryLabel {
    /// Label values in the order of [`BoundaryRegime::label_columns`].
    pub fn values(&self) -> Vec<Option<String>> {
        match self {
            BoundaryLabel::ClinicVisit {
                visit,
                participant_state,
            } => vec![Some(visit.clone()), participant_state.clone()],
            BoundaryLabel::MotorTask {
                visit,
                task,
                task_code,
            } => vec![Some(visit.clone()), Some(task.clone()), task_code.clone()],
            BoundaryLabel::HomeState { date, state } => {
                vec![Some(date.to_string()), Some(state.to_string())]
            }
            BoundaryLabel::DiaryCheckpoint { date, index } => {
                vec![Some(date.to_string()), Some(index.to_string())]
            }
            BoundaryLabel::SymptomReport {
                on_off,
                tremor,
                dyskinesia,
                activity_intensity,
            } => vec![
                on_off.clone(),
                tremor.clone(),
                dyskinesia.clone(),
                activity_intensity.clone(),
            ],
        }
    }
}

/// One resolved boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub segment_id: SegmentId,
    pub subject_id: SubjectId,
    pub label: BoundaryLabel,
    pub window: BoundaryWindow,
    /// Pass-through columns of the originating record (e.g. symptom scores)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Boundary {
    /// Create a boundary with a freshly generated segment id.
    pub fn new(subject_id: SubjectId, label: BoundaryLabel, window: BoundaryWindow) -> Self {
        Self {
            segment_id: SegmentId::generate(),
            subject_id,
            label,
            window,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Unrecorded checkpoint slot of a kept diary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedSlot {
    pub segment_id: SegmentId,
    pub subject_id: SubjectId,
    pub label: BoundaryLabel,
}

impl ReservedSlot {
    pub fn new(subject_id: SubjectId, label: BoundaryLabel) -> Self {
        Self {
            segment_id: SegmentId::generate(),
            subject_id,
            label,
        }
    }
}

/// All boundaries of one regime for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySet {
    pub regime: BoundaryRegime,
    boundaries: Vec<Boundary>,
    #[serde(default)]
    reserved: Vec<ReservedSlot>,
}

impl BoundarySet {
    pub fn new(regime: BoundaryRegime, boundaries: Vec<Boundary>) -> Self {
        Self {
            regime,
            boundaries,
            reserved: Vec::new(),
        }
    }

    /// Attach slots that keep a null row downstream without being boundaries.
    pub fn with_reserved(mut self, reserved: Vec<ReservedSlot>) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn reserved(&self) -> &[ReservedSlot] {
        &self.reserved
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Boundaries grouped by subject, in resolution order.
    pub fn by_subject(&self) -> HashMap<SubjectId, Vec<&Boundary>> {
        let mut grouped: HashMap<SubjectId, Vec<&Boundary>> = HashMap::new();
        for boundary in &self.boundaries {
            grouped
                .entry(boundary.subject_id.clone())
                .or_default()
                .push(boundary);
        }
        grouped
    }

    pub fn get(&self, segment_id: &str) -> Option<&Boundary> {
        self.boundaries
            .iter()
            .find(|b| b.segment_id.as_str() == segment_id)
    }

    /// Export as a row-oriented reference table keyed by `segment_id`.
    pub fn to_table(&self) -> Result<Table, ContractError> {
        let attribute_columns: BTreeSet<&str> = self
            .boundaries
            .iter()
            .flat_map(|b| b.attributes.keys().map(String::as_str))
            .collect();

        let window_columns: &[&str] = if self.regime.uses_center_points() {
            &["center_time"]
        } else {
            &["start_time", "end_time", "duration_s"]
        };

        let mut columns: Vec<String> = vec!["segment_id".into(), "subject_id".into()];
        columns.extend(self.regime.label_columns().iter().map(|c| c.to_string()));
        columns.extend(window_columns.iter().map(|c| c.to_string()));
        columns.extend(attribute_columns.iter().map(|c| c.to_string()));

        let mut table = Table::new("boundaries", columns);
        for boundary in &self.boundaries {
            let mut row = vec![
                Some(boundary.segment_id.to_string()),
                Some(boundary.subject_id.to_string()),
            ];
            row.extend(boundary.label.values());
            match boundary.window {
                BoundaryWindow::Interval { start, end } => {
                    row.push(Some(format_seconds(start)));
                    row.push(Some(format_seconds(end)));
                    row.push(Some(format!("{:.3}", end - start)));
                }
                BoundaryWindow::CenterPoint { center } => {
                    row.push(Some(format_seconds(center)));
                }
            }
            for column in &attribute_columns {
                row.push(boundary.attributes.get(*column).cloned());
            }
            table.push_row(row)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 11, 29).unwrap()
    }

    #[test]
    fn test_center_point_range() {
        let window = BoundaryWindow::CenterPoint { center: 1000.0 };
        assert_eq!(window.range(600.0), (400.0, 1600.0));
        assert_eq!(window.anchor(), 1000.0);
    }

    #[test]
    fn test_reserved_slots_stay_out_of_table() {
        let recorded = Boundary::new(
            "hbv012".into(),
            BoundaryLabel::DiaryCheckpoint {
                date: date(),
                index: 3,
            },
            BoundaryWindow::CenterPoint { center: 1000.0 },
        );
        let reserved = (1..=6)
            .filter(|i| *i != 3)
            .map(|index| {
                ReservedSlot::new(
                    "hbv012".into(),
                    BoundaryLabel::DiaryCheckpoint {
                        date: date(),
                        index,
                    },
                )
            })
            .collect();
        let set = BoundarySet::new(BoundaryRegime::DiaryCheckpoints, vec![recorded])
            .with_reserved(reserved);

        assert_eq!(set.len(), 1);
        assert_eq!(set.reserved().len(), 5);
        let table = set.to_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records().next().unwrap().get("interval"), Some("3"));
    }

    #[test]
    fn test_symptom_report_values() {
        let label = BoundaryLabel::SymptomReport {
            on_off: Some("1".into()),
            tremor: None,
            dyskinesia: Some("0".into()),
            activity_intensity: None,
        };
        assert_eq!(
            label.values(),
            vec![Some("1".to_string()), None, Some("0".to_string()), None]
        );
    }

    #[test]
    fn test_to_table_interval_columns() {
        let boundary = Boundary::new(
            "hbv012".into(),
            BoundaryLabel::HomeState {
                date: date(),
                state: MedicationState::Off,
            },
            BoundaryWindow::Interval {
                start: 0.0,
                end: 90.0,
            },
        );
        let id = boundary.segment_id.clone();
        let set = BoundarySet::new(BoundaryRegime::HomeOnOff, vec![boundary]);
        let table = set.to_table().unwrap();
        assert_eq!(
            table.columns(),
            &[
                "segment_id",
                "subject_id",
                "date",
                "state",
                "start_time",
                "end_time",
                "duration_s"
            ]
        );
        let record = table.records().next().unwrap();
        assert_eq!(record.get("segment_id"), Some(id.as_str()));
        assert_eq!(record.get("state"), Some("off"));
        assert_eq!(record.get("duration_s"), Some("90.000"));
    }

    #[test]
    fn test_to_table_includes_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert("tremor_left".to_string(), "2".to_string());
        let boundary = Boundary::new(
            "1004".into(),
            BoundaryLabel::MotorTask {
                visit: "2 Weeks: Time 0".into(),
                task: "Drinking".into(),
                task_code: Some("drnkg".into()),
            },
            BoundaryWindow::Interval {
                start: 10.0,
                end: 20.0,
            },
        )
        .with_attributes(attributes);
        let set = BoundarySet::new(BoundaryRegime::MotorTask, vec![boundary]);
        let table = set.to_table().unwrap();
        assert!(table.columns().iter().any(|c| c == "tremor_left"));
        assert_eq!(table.records().next().unwrap().get("tremor_left"), Some("2"));
    }

    #[test]
    fn test_by_subject_groups() {
        let make = |subject: &str| {
            Boundary::new(
                subject.into(),
                BoundaryLabel::DiaryCheckpoint {
                    date: date(),
                    index: 1,
                },
                BoundaryWindow::CenterPoint { center: 0.0 },
            )
        };
        let set = BoundarySet::new(
            BoundaryRegime::DiaryCheckpoints,
            vec![make("a"), make("b"), make("a")],
        );
        let grouped = set.by_subject();
        assert_eq!(grouped["a"].len(), 2);
        assert_eq!(grouped["b"].len(), 1);
    }
}
