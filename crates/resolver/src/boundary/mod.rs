//! Boundary Resolver
//!
//! Derives labelled time windows from clinical record sets. Each regime is a
//! separate resolver; [`BoundaryResolver`] selects one by the run's regime
//! tag and assigns every surviving boundary a fresh segment id.

mod clinic_visit;
mod diary;
mod home_on_off;
mod motor_task;
mod symptom_diary;

use contracts::{
    BoundaryRegime, BoundarySet, CenterPointPolicy, CurationBlueprint, DiscardTally, Table,
    TableKind,
};
use tracing::{info, instrument};

use crate::error::{ResolveError, Result};

pub use clinic_visit::columns as clinic_visit_columns;
pub use diary::columns as diary_columns;
pub use home_on_off::columns as home_columns;
pub use motor_task::{columns as motor_task_columns, task_code, SCORE_COLUMNS, TASK_CODE_MAP};
pub use symptom_diary::columns as symptom_diary_columns;

/// Discard rule names shared by the regimes
pub mod rules {
    pub const MISSING_SUBJECT: &str = "missing_subject";
    pub const MISSING_VISIT: &str = "missing_visit";
    pub const MISSING_DATE: &str = "missing_date";
    pub const MISSING_BOUND: &str = "missing_bound";
    pub const NON_POSITIVE_DURATION: &str = "non_positive_duration";
    pub const NO_PARTICIPANT_STATE: &str = "no_participant_state";
    pub const NO_FOLLOWING_TASK: &str = "no_following_task";
    pub const NO_CHECKPOINTS: &str = "no_checkpoints";
    pub const UNKNOWN_MEASUREMENT: &str = "unknown_measurement";
    pub const SUPERSEDED_REPORT: &str = "superseded_report";
}

/// Clinical tables handed to the resolver
#[derive(Debug, Clone, Default)]
pub struct BoundaryTables {
    pub updrs_part3: Option<Table>,
    pub motor_tasks: Option<Table>,
    pub home_timestamps: Option<Table>,
    pub symptom_diary: Option<Table>,
}

impl BoundaryTables {
    pub fn get(&self, kind: TableKind) -> Option<&Table> {
        match kind {
            TableKind::UpdrsPart3 => self.updrs_part3.as_ref(),
            TableKind::MotorTasks => self.motor_tasks.as_ref(),
            TableKind::HomeTimestamps => self.home_timestamps.as_ref(),
            TableKind::SymptomDiary => self.symptom_diary.as_ref(),
            TableKind::VideoDeviceSync => None,
        }
    }

    pub fn insert(&mut self, kind: TableKind, table: Table) {
        match kind {
            TableKind::UpdrsPart3 => self.updrs_part3 = Some(table),
            TableKind::MotorTasks => self.motor_tasks = Some(table),
            TableKind::HomeTimestamps => self.home_timestamps = Some(table),
            TableKind::SymptomDiary => self.symptom_diary = Some(table),
            TableKind::VideoDeviceSync => {}
        }
    }

    fn require(&self, regime: BoundaryRegime, kind: TableKind) -> Result<&Table> {
        self.get(kind).ok_or(ResolveError::MissingTable {
            regime: regime.as_str(),
            table: kind.as_str(),
        })
    }
}

/// Resolved boundaries plus what was left out.
///
/// Reserved diary slots travel inside `boundaries` but are not counted as
/// boundaries.
#[derive(Debug, Clone)]
pub struct BoundaryResolution {
    pub boundaries: BoundarySet,
    pub discards: DiscardTally,
}

/// Regime-selected boundary resolver
#[derive(Debug, Clone, Copy)]
pub struct BoundaryResolver {
    regime: BoundaryRegime,
    center_point_policy: CenterPointPolicy,
}

impl BoundaryResolver {
    pub fn new(regime: BoundaryRegime, center_point_policy: CenterPointPolicy) -> Self {
        Self {
            regime,
            center_point_policy,
        }
    }

    pub fn from_blueprint(blueprint: &CurationBlueprint) -> Self {
        Self::new(blueprint.regime, blueprint.effective_center_point_policy())
    }

    pub fn regime(&self) -> BoundaryRegime {
        self.regime
    }

    /// Resolve the boundaries of the configured regime.
    #[instrument(skip_all, fields(regime = self.regime.as_str()))]
    pub fn resolve(&self, tables: &BoundaryTables) -> Result<BoundaryResolution> {
        let mut discards = DiscardTally::new();
        let regime = self.regime;
        let mut reserved = Vec::new();
        let boundaries = match regime {
            BoundaryRegime::ClinicVisit => clinic_visit::resolve(
                tables.require(regime, TableKind::UpdrsPart3)?,
                tables.require(regime, TableKind::MotorTasks)?,
                &mut discards,
            )?,
            BoundaryRegime::MotorTask => motor_task::resolve(
                tables.require(regime, TableKind::MotorTasks)?,
                &mut discards,
            )?,
            BoundaryRegime::HomeOnOff => home_on_off::resolve(
                tables.require(regime, TableKind::HomeTimestamps)?,
                &mut discards,
            )?,
            BoundaryRegime::DiaryCheckpoints => {
                let (boundaries, slots) = diary::resolve(
                    tables.require(regime, TableKind::HomeTimestamps)?,
                    self.center_point_policy,
                    &mut discards,
                )?;
                reserved = slots;
                boundaries
            }
            BoundaryRegime::SymptomDiary => symptom_diary::resolve(
                tables.require(regime, TableKind::SymptomDiary)?,
                &mut discards,
            )?,
        };

        metrics::counter!("curation_boundaries_resolved_total", "regime" => regime.as_str())
            .increment(boundaries.len() as u64);
        for (rule, n) in discards.iter() {
            metrics::counter!(
                "curation_boundaries_discarded_total",
                "regime" => regime.as_str(),
                "rule" => rule.to_string()
            )
            .increment(n as u64);
        }
        info!(
            boundaries = boundaries.len(),
            reserved = reserved.len(),
            discarded = discards.total(),
            "boundaries resolved"
        );
        Ok(BoundaryResolution {
            boundaries: BoundarySet::new(regime, boundaries).with_reserved(reserved),
            discards,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_is_an_error() {
        let resolver = BoundaryResolver::new(BoundaryRegime::MotorTask, CenterPointPolicy::Drop);
        let err = resolver.resolve(&BoundaryTables::default()).unwrap_err();
        assert!(
            matches!(err, ResolveError::MissingTable { table: "motor_tasks", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_symptom_diary_needs_its_table() {
        let resolver = BoundaryResolver::new(BoundaryRegime::SymptomDiary, CenterPointPolicy::Drop);
        let err = resolver.resolve(&BoundaryTables::default()).unwrap_err();
        assert!(
            matches!(err, ResolveError::MissingTable { table: "symptom_diary", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_segment_ids_are_unique() {
        let table = test_support::table(
            "home_timestamps",
            &[
                "Record Id",
                "date_screening",
                "Time_interval_1",
                "Time_interval_2",
                "Time_interval_3",
                "Time_interval_4",
                "Time_interval_5",
                "Time_interval_6",
            ],
            &[&["hbv012", "29-11-2018", "08:00", "10:00", "", "", "", ""]],
        );
        let tables = BoundaryTables {
            home_timestamps: Some(table),
            ..Default::default()
        };
        let resolution = BoundaryResolver::new(
            BoundaryRegime::DiaryCheckpoints,
            CenterPointPolicy::PreserveCardinality,
        )
        .resolve(&tables)
        .unwrap();
        let ids: std::collections::HashSet<_> = resolution
            .boundaries
            .boundaries()
            .iter()
            .map(|b| b.segment_id.clone())
            .chain(
                resolution
                    .boundaries
                    .reserved()
                    .iter()
                    .map(|r| r.segment_id.clone()),
            )
            .collect();
        assert_eq!(resolution.boundaries.len(), 2);
        assert_eq!(resolution.boundaries.reserved().len(), 4);
        assert_eq!(ids.len(), 6);
        assert_eq!(resolution.boundaries.regime, BoundaryRegime::DiaryCheckpoints);
    }
}
