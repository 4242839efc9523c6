//! At-home symptom diary
//!
//! The diary export is long-format: one row per (subject, report time,
//! measurement). A measurement can be re-reported for the same report time;
//! the latest `Reported Timestamp` wins. Every distinct (subject, report
//! time) becomes one checkpoint labelled with the four pivoted scores.

use std::cmp::Ordering;

use contracts::time::parse_instant;
use contracts::{
    Boundary, BoundaryLabel, BoundaryWindow, ContractError, DiscardTally, SubjectId, Table,
};

use super::rules;

/// Source columns
pub mod columns {
    pub const SUBJECT: &str = "SubjID";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const REPORTED: &str = "Reported Timestamp";
    pub const MEASUREMENT: &str = "Measurement Name";
    pub const VALUE: &str = "Value";
}

/// Reported measurements, in label order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Symptom {
    OnOff,
    Tremor,
    Dyskinesia,
    ActivityIntensity,
}

impl Symptom {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "On/Off" => Some(Symptom::OnOff),
            "Tremor" => Some(Symptom::Tremor),
            "Dyskinesia" => Some(Symptom::Dyskinesia),
            "Activity Intensity" => Some(Symptom::ActivityIntensity),
            _ => None,
        }
    }
}

struct Report {
    subject_id: SubjectId,
    timestamp: f64,
    symptom: Symptom,
    reported: Option<f64>,
    value: Option<String>,
}

impl Report {
    fn same_entry(&self, other: &Report) -> bool {
        self.subject_id == other.subject_id && self.timestamp == other.timestamp
    }

    /// Subject, report time, measurement, then reported time (unknown first).
    fn order(&self, other: &Report) -> Ordering {
        self.subject_id
            .cmp(&other.subject_id)
            .then(self.timestamp.total_cmp(&other.timestamp))
            .then(self.symptom.cmp(&other.symptom))
            .then(match (self.reported, other.reported) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }
}

#[derive(Default)]
struct Scores {
    on_off: Option<String>,
    tremor: Option<String>,
    dyskinesia: Option<String>,
    activity_intensity: Option<String>,
}

impl Scores {
    fn slot(&mut self, symptom: Symptom) -> &mut Option<String> {
        match symptom {
            Symptom::OnOff => &mut self.on_off,
            Symptom::Tremor => &mut self.tremor,
            Symptom::Dyskinesia => &mut self.dyskinesia,
            Symptom::ActivityIntensity => &mut self.activity_intensity,
        }
    }

    fn into_label(self) -> BoundaryLabel {
        BoundaryLabel::SymptomReport {
            on_off: self.on_off,
            tremor: self.tremor,
            dyskinesia: self.dyskinesia,
            activity_intensity: self.activity_intensity,
        }
    }
}

pub(super) fn resolve(
    diary: &Table,
    discards: &mut DiscardTally,
) -> Result<Vec<Boundary>, ContractError> {
    diary.require_columns(&[
        columns::SUBJECT,
        columns::TIMESTAMP,
        columns::MEASUREMENT,
        columns::VALUE,
    ])?;
    let has_reported = diary.column_index(columns::REPORTED).is_some();

    let mut reports = Vec::with_capacity(diary.len());
    for record in diary.records() {
        let Some(subject_id) = record.get(columns::SUBJECT).and_then(SubjectId::parse) else {
            discards.record(rules::MISSING_SUBJECT);
            continue;
        };
        let Some(timestamp) = record.get(columns::TIMESTAMP).and_then(parse_instant) else {
            discards.record(rules::MISSING_BOUND);
            continue;
        };
        let Some(symptom) = record.get(columns::MEASUREMENT).and_then(Symptom::parse) else {
            discards.record(rules::UNKNOWN_MEASUREMENT);
            continue;
        };
        let reported = has_reported
            .then(|| record.get(columns::REPORTED).and_then(parse_instant))
            .flatten();
        reports.push(Report {
            subject_id,
            timestamp,
            symptom,
            reported,
            value: record.get(columns::VALUE).map(str::to_string),
        });
    }
    // Stable: rows with equal keys keep file order, so the later row wins.
    reports.sort_by(Report::order);

    let mut boundaries = Vec::new();
    let mut reports = reports.into_iter().peekable();
    while let Some(first) = reports.next() {
        let mut scores = Scores::default();
        let subject_id = first.subject_id.clone();
        let timestamp = first.timestamp;
        let mut last_symptom = None;

        let mut current = Some(first);
        while let Some(report) = current {
            if last_symptom == Some(report.symptom) {
                discards.record(rules::SUPERSEDED_REPORT);
            }
            last_symptom = Some(report.symptom);
            current = reports.next_if(|next| next.same_entry(&report));
            *scores.slot(report.symptom) = report.value;
        }

        boundaries.push(Boundary::new(
            subject_id,
            scores.into_label(),
            BoundaryWindow::CenterPoint { center: timestamp },
        ));
    }
    Ok(boundaries)
}
