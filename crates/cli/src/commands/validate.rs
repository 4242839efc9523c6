//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignmentStrategy, CurationBlueprint, SinkType, TimeAxis};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    cohort: String,
    regime: String,
    source_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    cohort: blueprint.cohort.as_str().to_string(),
                    regime: blueprint.regime.as_str().to_string(),
                    source_count: blueprint.sources.len(),
                    sink_count: blueprint.output.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &CurationBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.output.sinks.is_empty() {
        warnings.push("No sinks configured - the segment table will be discarded".to_string());
    } else if !blueprint
        .output
        .sinks
        .iter()
        .any(|s| s.sink_type == SinkType::File)
    {
        warnings.push("No file sink configured - nothing is written to disk".to_string());
    }

    for source in &blueprint.sources {
        if !source.dir.is_dir() {
            warnings.push(format!(
                "Source '{}' directory does not exist: {}",
                source.id,
                source.dir.display()
            ));
        }
    }

    if blueprint.cohort.alignment() == AlignmentStrategy::DeviceOffset {
        let epoch = &blueprint.alignment.recording_epoch;
        if !epoch.enabled {
            warnings.push(
                "recording_epoch rule disabled - all calibration pairings are kept".to_string(),
            );
        } else {
            for source in blueprint
                .sources
                .iter()
                .filter(|s| s.time_axis != TimeAxis::Datetime)
            {
                warnings.push(format!(
                    "Source '{}' uses a relative time axis but the recording_epoch rule \
                     drops device times before {} - calibration pairs may all be discarded",
                    source.id, epoch.min_year
                ));
            }
        }
    }

    if blueprint.center_point_policy.is_some()
        && blueprint.center_point_policy != Some(blueprint.cohort.default_center_point_policy())
    {
        warnings.push(format!(
            "center_point_policy overrides the {} default",
            blueprint.cohort.as_str()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK: configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Cohort: {}", summary.cohort);
            println!("  Regime: {}", summary.regime);
            println!("  Sources: {}", summary.source_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("INVALID: configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
