//! Diary checkpoints
//!
//! Six time-of-day checkpoints per subject per screening day. Each recorded
//! checkpoint becomes a center point. Under
//! [`CenterPointPolicy::PreserveCardinality`] the unrecorded checkpoints of a
//! kept row become [`ReservedSlot`]s so every slot keeps a row downstream.

use contracts::time::{parse_date, parse_date_and_time};
use contracts::{
    Boundary, BoundaryLabel, BoundaryWindow, CenterPointPolicy, ContractError, DiscardTally,
    ReservedSlot, SubjectId, Table,
};

use super::rules;

/// Source columns
pub mod columns {
    pub const SUBJECT: &str = "Record Id";
    pub const DATE: &str = "date_screening";
    pub const CHECKPOINTS: [&str; 6] = [
        "Time_interval_1",
        "Time_interval_2",
        "Time_interval_3",
        "Time_interval_4",
        "Time_interval_5",
        "Time_interval_6",
    ];
}

pub(super) fn resolve(
    export: &Table,
    policy: CenterPointPolicy,
    discards: &mut DiscardTally,
) -> Result<(Vec<Boundary>, Vec<ReservedSlot>), ContractError> {
    export.require_columns(&[columns::SUBJECT, columns::DATE])?;
    export.require_columns(&columns::CHECKPOINTS)?;

    let mut boundaries = Vec::new();
    let mut reserved = Vec::new();
    for record in export.records() {
        let Some(subject_id) = record.get(columns::SUBJECT).and_then(SubjectId::parse) else {
            discards.record(rules::MISSING_SUBJECT);
            continue;
        };
        let Some(date) = record.get(columns::DATE).and_then(parse_date) else {
            discards.record(rules::MISSING_DATE);
            continue;
        };

        let centers: Vec<Option<f64>> = columns::CHECKPOINTS
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .and_then(|raw| parse_date_and_time(date, raw))
            })
            .collect();
        if centers.iter().all(Option::is_none) {
            discards.record(rules::NO_CHECKPOINTS);
            continue;
        }

        for (slot, center) in centers.into_iter().enumerate() {
            let label = BoundaryLabel::DiaryCheckpoint {
                date,
                index: slot as u8 + 1,
            };
            match center {
                Some(center) => boundaries.push(Boundary::new(
                    subject_id.clone(),
                    label,
                    BoundaryWindow::CenterPoint { center },
                )),
                None if policy == CenterPointPolicy::PreserveCardinality => {
                    reserved.push(ReservedSlot::new(subject_id.clone(), label));
                }
                None => {}
            }
        }
    }
    Ok((boundaries, reserved))
}
