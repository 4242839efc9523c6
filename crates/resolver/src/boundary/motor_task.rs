//! Motor-task intervals
//!
//! Every scored task of the clinic task sheet is its own boundary, bounded
//! by the task's start and stop timestamps.

use std::collections::BTreeMap;

use contracts::time::parse_instant;
use contracts::{Boundary, BoundaryLabel, BoundaryWindow, ContractError, DiscardTally, SubjectId, Table};

use super::rules;

/// Source columns
pub mod columns {
    pub const SUBJECT: &str = "SubjID";
    pub const VISIT: &str = "Visit";
    pub const TASK: &str = "Task";
    pub const TASK_ABBREVIATION: &str = "TaskAbb";
    pub const START: &str = "Start Timestamp (UTC)";
    pub const STOP: &str = "Stop Timestamp (UTC)";
}

/// Task abbreviations mapped onto the public task codes
pub const TASK_CODE_MAP: &[(&str, &str)] = &[
    ("Drnkg", "drnkg"),
    ("Drwg", "drwg"),
    ("Fldg", "fldng"),
    ("FtnL", "ftnl"),
    ("FtnR", "ftnr"),
    ("NtsBts", "ntblt"),
    ("RamL", "raml"),
    ("RamR", "ramr"),
    ("Sheets", "orgpa"),
    ("Sitng", "sittg"),
    ("SitStand", "ststd"),
    ("Stndg", "stndg"),
    ("Typg", "typng"),
    ("Wlkg", "wlkgs"),
    ("WlkgCnt", "wlkgc"),
];

/// Score columns carried as boundary attributes
pub const SCORE_COLUMNS: &[(&str, &str)] = &[
    ("Tremor - Left", "tremor_left"),
    ("Tremor - Right", "tremor_right"),
    ("Bradykinesia - Left", "bradykinesia_left"),
    ("Bradykinesia - Right", "bradykinesia_right"),
    ("Dyskinesia - Left", "dyskinesia_left"),
    ("Dyskinesia - Right", "dyskinesia_right"),
    ("Overall", "overall"),
    ("Validated", "validated"),
    ("Side", "smartwatch_side"),
];

/// Public code of a task abbreviation.
pub fn task_code(abbreviation: &str) -> Option<&'static str> {
    TASK_CODE_MAP
        .iter()
        .find(|(abb, _)| *abb == abbreviation)
        .map(|(_, code)| *code)
}

pub(super) fn resolve(
    tasks: &Table,
    discards: &mut DiscardTally,
) -> Result<Vec<Boundary>, ContractError> {
    tasks.require_columns(&[
        columns::SUBJECT,
        columns::VISIT,
        columns::TASK,
        columns::START,
        columns::STOP,
    ])?;

    let mut boundaries = Vec::with_capacity(tasks.len());
    for record in tasks.records() {
        let Some(subject_id) = record.get(columns::SUBJECT).and_then(SubjectId::parse) else {
            discards.record(rules::MISSING_SUBJECT);
            continue;
        };
        let start = record.get(columns::START).and_then(parse_instant);
        let stop = record.get(columns::STOP).and_then(parse_instant);
        let (Some(start), Some(end)) = (start, stop) else {
            discards.record(rules::MISSING_BOUND);
            continue;
        };
        if end <= start {
            discards.record(rules::NON_POSITIVE_DURATION);
            continue;
        }

        let attributes: BTreeMap<String, String> = SCORE_COLUMNS
            .iter()
            .filter_map(|(column, name)| {
                record
                    .get(column)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        boundaries.push(
            Boundary::new(
                subject_id,
                BoundaryLabel::MotorTask {
                    visit: record.get(columns::VISIT).unwrap_or_default().to_string(),
                    task: record.get(columns::TASK).unwrap_or_default().to_string(),
                    task_code: record
                        .get(columns::TASK_ABBREVIATION)
                        .and_then(task_code)
                        .map(String::from),
                },
                BoundaryWindow::Interval { start, end },
            )
            .with_attributes(attributes),
        );
    }
    Ok(boundaries)
}
