//! Home on/off intervals
//!
//! The home-visit export records, per subject and screening day, when the
//! OFF and ON rating blocks started and when free living resumed. Each
//! complete start/stop pair is one interval.

use contracts::time::{parse_date, parse_date_and_time};
use contracts::{
    Boundary, BoundaryLabel, BoundaryWindow, ContractError, DiscardTally, MedicationState,
    SubjectId, Table,
};

use super::rules;

/// Source columns
pub mod columns {
    pub const SUBJECT: &str = "Record Id";
    pub const DATE: &str = "date_screening";
    pub const OFF_START: &str = "OFF_UPDRS_start";
    pub const OFF_STOP: &str = "OFF_free_living_start";
    pub const ON_START: &str = "ON_UPDRS_start";
    pub const ON_STOP: &str = "ON_free_living_start";
}

const STATE_COLUMNS: [(MedicationState, &str, &str); 2] = [
    (MedicationState::Off, columns::OFF_START, columns::OFF_STOP),
    (MedicationState::On, columns::ON_START, columns::ON_STOP),
];

pub(super) fn resolve(
    export: &Table,
    discards: &mut DiscardTally,
) -> Result<Vec<Boundary>, ContractError> {
    export.require_columns(&[
        columns::SUBJECT,
        columns::DATE,
        columns::OFF_START,
        columns::OFF_STOP,
        columns::ON_START,
        columns::ON_STOP,
    ])?;

    let mut boundaries = Vec::new();
    for record in export.records() {
        let Some(subject_id) = record.get(columns::SUBJECT).and_then(SubjectId::parse) else {
            discards.record(rules::MISSING_SUBJECT);
            continue;
        };
        let Some(date) = record.get(columns::DATE).and_then(parse_date) else {
            discards.record(rules::MISSING_DATE);
            continue;
        };

        for (state, start_column, stop_column) in STATE_COLUMNS {
            // Negative integers in time cells are export artifacts
            let start = record
                .get(start_column)
                .and_then(|raw| parse_date_and_time(date, raw));
            let stop = record
                .get(stop_column)
                .and_then(|raw| parse_date_and_time(date, raw));
            let (Some(start), Some(end)) = (start, stop) else {
                discards.record(rules::MISSING_BOUND);
                continue;
            };
            if end <= start {
                discards.record(rules::NON_POSITIVE_DURATION);
                continue;
            }
            boundaries.push(Boundary::new(
                subject_id.clone(),
                BoundaryLabel::HomeState { date, state },
                BoundaryWindow::Interval { start, end },
            ));
        }
    }
    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::table;
    use super::*;
    use chrono::NaiveDate;

    const COLUMNS: &[&str] = &[
        "Record Id",
        "date_screening",
        "OFF_UPDRS_start",
        "OFF_free_living_start",
        "ON_UPDRS_start",
        "ON_free_living_start",
    ];

    #[test]
    fn test_on_and_off_intervals() {
        let export = table(
            "home_timestamps",
            COLUMNS,
            &[&["hbv012", "29-11-2018", "09:00", "09:45", "12:00", "12:40"]],
        );
        let mut discards = DiscardTally::new();
        let boundaries = resolve(&export, &mut discards).unwrap();
        assert_eq!(boundaries.len(), 2);
        let date = NaiveDate::from_ymd_opt(2018, 11, 29).unwrap();
        assert_eq!(
            boundaries[0].label,
            BoundaryLabel::HomeState {
                date,
                state: MedicationState::Off
            }
        );
        let (start, end) = boundaries[1].window.range(0.0);
        assert_eq!(end - start, 2400.0);
    }

    #[test]
    fn test_negative_artifacts_are_missing() {
        let export = table(
            "home_timestamps",
            COLUMNS,
            &[
                &["hbv012", "29-11-2018", "-99", "09:45", "12:00", "12:40"],
                &["hbv013", "30-11-2018", "09:00", "-1", "", ""],
            ],
        );
        let mut discards = DiscardTally::new();
        let boundaries = resolve(&export, &mut discards).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].subject_id.as_str(), "hbv012");
        assert_eq!(discards.get(rules::MISSING_BOUND), 3);
    }

    #[test]
    fn test_reversed_interval_discarded() {
        let export = table(
            "home_timestamps",
            COLUMNS,
            &[&["hbv012", "29-11-2018", "10:00", "09:00", "", ""]],
        );
        let mut discards = DiscardTally::new();
        let boundaries = resolve(&export, &mut discards).unwrap();
        assert!(boundaries.is_empty());
        assert_eq!(discards.get(rules::NON_POSITIVE_DURATION), 1);
    }

    #[test]
    fn test_missing_date_drops_row() {
        let export = table(
            "home_timestamps",
            COLUMNS,
            &[&["hbv012", "", "09:00", "09:45", "", ""]],
        );
        let mut discards = DiscardTally::new();
        assert!(resolve(&export, &mut discards).unwrap().is_empty());
        assert_eq!(discards.get(rules::MISSING_DATE), 1);
    }
}
