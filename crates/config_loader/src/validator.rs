//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the blueprint types (radius, pool size, epoch year)
//! - regime belongs to the configured cohort
//! - every table the regime reads is configured
//! - at least one source; source ids unique; channel lists non-empty
//! - center-point radius > 0 for checkpoint regimes
//! - sink names non-empty and unique

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, CurationBlueprint};

/// Validate a CurationBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    validate_field_ranges(blueprint)?;
    validate_regime(blueprint)?;
    validate_tables(blueprint)?;
    validate_sources(blueprint)?;
    validate_alignment(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Declarative field checks
fn validate_field_ranges(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Regime must belong to the cohort
fn validate_regime(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    if !blueprint.cohort.supports(blueprint.regime) {
        return Err(ContractError::config_validation(
            "regime",
            format!(
                "regime '{}' belongs to cohort '{}', not '{}'",
                blueprint.regime.as_str(),
                blueprint.regime.cohort().as_str(),
                blueprint.cohort.as_str()
            ),
        ));
    }
    Ok(())
}

/// Required tables must be configured
fn validate_tables(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    for kind in blueprint.regime.required_tables() {
        if blueprint.tables.get(*kind).is_none() {
            return Err(ContractError::config_validation(
                format!("tables.{}", kind.as_str()),
                format!(
                    "table is required for regime '{}'",
                    blueprint.regime.as_str()
                ),
            ));
        }
    }
    Ok(())
}

/// Source ids unique, channels present
fn validate_sources(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    if blueprint.sources.is_empty() {
        return Err(ContractError::config_validation(
            "sources",
            "at least one sensor source is required",
        ));
    }
    let mut seen = HashSet::new();
    for source in &blueprint.sources {
        if !seen.insert(source.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sources[id={}]", source.id),
                "duplicate source id",
            ));
        }
        if source.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(ContractError::config_validation(
                format!("sources[{}].channels", source.id),
                "channel names cannot be empty",
            ));
        }
        if source.channels.contains(&source.time_column) {
            return Err(ContractError::config_validation(
                format!("sources[{}].channels", source.id),
                format!("time column '{}' listed as a channel", source.time_column),
            ));
        }
    }
    Ok(())
}

/// Checkpoint windows need a positive radius
fn validate_alignment(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    let radius = blueprint.alignment.center_radius_s;
    if blueprint.regime.uses_center_points() && radius <= 0.0 {
        return Err(ContractError::config_validation(
            "alignment.center_radius_s",
            format!("center_radius_s must be > 0 for checkpoint regimes, got {radius}"),
        ));
    }
    Ok(())
}

/// Sink names present and unique
fn validate_sinks(blueprint: &CurationBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.output.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("output.sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("output.sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}
