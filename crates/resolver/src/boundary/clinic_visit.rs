//! Clinic-visit intervals
//!
//! A visit period runs from the rating-scale start to the first motor task
//! performed afterwards. Candidate ends come from the task sheet; only
//! strictly positive durations count and the smallest one wins. Ties go to
//! the earliest start.

use std::collections::{BTreeMap, HashMap};

use contracts::time::parse_instant;
use contracts::{Boundary, BoundaryLabel, BoundaryWindow, ContractError, DiscardTally, SubjectId, Table};
use tracing::debug;

use super::rules;

/// Source columns
pub mod columns {
    pub const RATING_SUBJECT: &str = "Subject ID";
    pub const RATING_VISIT: &str = "Visit";
    pub const RATING_START: &str = "DateTime";
    pub const PARTICIPANT_STATE: &str = "ParticipantState";
    pub const TASK_SUBJECT: &str = "SubjID";
    pub const TASK_VISIT: &str = "Visit";
    pub const TASK_START: &str = "Start Timestamp (UTC)";
}

type VisitKey = (SubjectId, String);

struct RatingStart {
    start: f64,
    participant_state: String,
}

pub(super) fn resolve(
    ratings: &Table,
    tasks: &Table,
    discards: &mut DiscardTally,
) -> Result<Vec<Boundary>, ContractError> {
    ratings.require_columns(&[
        columns::RATING_SUBJECT,
        columns::RATING_VISIT,
        columns::RATING_START,
        columns::PARTICIPANT_STATE,
    ])?;
    tasks.require_columns(&[columns::TASK_SUBJECT, columns::TASK_VISIT, columns::TASK_START])?;

    let task_starts = index_task_starts(tasks);
    let rating_starts = collect_rating_starts(ratings, discards);

    let mut boundaries = Vec::with_capacity(rating_starts.len());
    for (key, candidates) in rating_starts {
        let Some(ends) = task_starts.get(&key) else {
            discards.record(rules::NO_FOLLOWING_TASK);
            continue;
        };
        let Some((rating, end)) = shortest_positive(&candidates, ends) else {
            debug!(subject_id = %key.0, visit = %key.1, "no task after rating start");
            discards.record(rules::NON_POSITIVE_DURATION);
            continue;
        };
        let (subject_id, visit) = key;
        boundaries.push(Boundary::new(
            subject_id,
            BoundaryLabel::ClinicVisit {
                visit,
                participant_state: Some(rating.participant_state.clone()),
            },
            BoundaryWindow::Interval {
                start: rating.start,
                end,
            },
        ));
    }
    Ok(boundaries)
}

/// Task start times per (subject, visit). Incomplete rows cannot end a
/// visit and are ignored.
fn index_task_starts(tasks: &Table) -> HashMap<VisitKey, Vec<f64>> {
    let mut index: HashMap<VisitKey, Vec<f64>> = HashMap::new();
    for record in tasks.records() {
        let subject_id = record.get(columns::TASK_SUBJECT).and_then(SubjectId::parse);
        let visit = record.get(columns::TASK_VISIT);
        let start = record.get(columns::TASK_START).and_then(parse_instant);
        if let (Some(subject_id), Some(visit), Some(start)) = (subject_id, visit, start) {
            index
                .entry((subject_id, visit.to_string()))
                .or_default()
                .push(start);
        }
    }
    index
}

/// Rated visit starts, grouped and ordered by (subject, visit).
fn collect_rating_starts(
    ratings: &Table,
    discards: &mut DiscardTally,
) -> BTreeMap<VisitKey, Vec<RatingStart>> {
    let mut starts: BTreeMap<VisitKey, Vec<RatingStart>> = BTreeMap::new();
    for record in ratings.records() {
        // State is only recorded at the rated visits
        let Some(participant_state) = record.get(columns::PARTICIPANT_STATE) else {
            discards.record(rules::NO_PARTICIPANT_STATE);
            continue;
        };
        let Some(subject_id) = record.get(columns::RATING_SUBJECT).and_then(SubjectId::parse)
        else {
            discards.record(rules::MISSING_SUBJECT);
            continue;
        };
        let Some(visit) = record.get(columns::RATING_VISIT) else {
            discards.record(rules::MISSING_VISIT);
            continue;
        };
        let Some(start) = record.get(columns::RATING_START).and_then(parse_instant) else {
            discards.record(rules::MISSING_BOUND);
            continue;
        };
        starts
            .entry((subject_id, visit.to_string()))
            .or_default()
            .push(RatingStart {
                start,
                participant_state: participant_state.to_string(),
            });
    }
    starts
}

/// Pairing with the smallest strictly positive duration; ties go to the
/// earliest start.
fn shortest_positive<'a>(
    candidates: &'a [RatingStart],
    ends: &[f64],
) -> Option<(&'a RatingStart, f64)> {
    candidates
        .iter()
        .flat_map(|rating| ends.iter().map(move |&end| (rating, end)))
        .filter(|(rating, end)| *end > rating.start)
        .min_by(|(a, a_end), (b, b_end)| {
            (a_end - a.start)
                .total_cmp(&(b_end - b.start))
                .then(a.start.total_cmp(&b.start))
        })
}
