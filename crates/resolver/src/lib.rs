//! # Resolver
//!
//! Reference tables derived once per run from static clinical sources.
//!
//! Responsibilities:
//! - Time-Reference Resolver: per-(subject, device) clock offsets from the
//!   paired-clock calibration sheet
//! - Boundary Resolver: labelled time windows for each boundary regime
//!   (clinic visit, motor task, symptom diary, home on/off, diary checkpoints)
//!
//! Both outputs are read-only lookups; nothing here touches sensor data.

mod boundary;
mod error;
mod time_reference;

pub use boundary::{
    clinic_visit_columns, diary_columns, home_columns, motor_task_columns, rules,
    symptom_diary_columns, task_code, BoundaryResolution, BoundaryResolver, BoundaryTables,
    SCORE_COLUMNS, TASK_CODE_MAP,
};
pub use error::{ResolveError, Result};
pub use time_reference::{
    columns as calibration_columns, rules as reference_rules, ReferenceResolution,
    TimeReferenceResolver,
};
