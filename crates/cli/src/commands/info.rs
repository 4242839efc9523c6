//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CurationBlueprint, TableKind};
use segment_curator::CliError;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    cohort: String,
    regime: String,
    alignment: AlignmentInfo,
    tables: Vec<TableInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    output_dir: String,
    pool_size: usize,
}

#[derive(Serialize)]
struct AlignmentInfo {
    strategy: String,
    center_point_policy: String,
    center_radius_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_epoch_min_year: Option<i32>,
}

#[derive(Serialize)]
struct TableInfo {
    kind: String,
    path: String,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    column: String,
    dir: String,
    prefix: String,
    time_axis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_column: Option<String>,
    channels: Vec<String>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

const TABLE_KINDS: [TableKind; 5] = [
    TableKind::UpdrsPart3,
    TableKind::MotorTasks,
    TableKind::SymptomDiary,
    TableKind::HomeTimestamps,
    TableKind::VideoDeviceSync,
];

fn build_config_info(blueprint: &CurationBlueprint, args: &InfoArgs) -> ConfigInfo {
    let epoch = &blueprint.alignment.recording_epoch;

    let tables = TABLE_KINDS
        .iter()
        .filter_map(|&kind| {
            blueprint.tables.get(kind).map(|source| TableInfo {
                kind: kind.as_str().to_string(),
                path: source.path.display().to_string(),
            })
        })
        .collect();

    let sources = if args.sources {
        blueprint
            .sources
            .iter()
            .map(|s| SourceInfo {
                id: s.id.clone(),
                column: format!("{}_{}", s.device, s.measurement),
                dir: s.dir.display().to_string(),
                prefix: s.prefix.clone(),
                time_axis: format!("{:?}", s.time_axis),
                location_column: s.location_column.clone(),
                channels: s.channels.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .output
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        cohort: blueprint.cohort.as_str().to_string(),
        regime: blueprint.regime.as_str().to_string(),
        alignment: AlignmentInfo {
            strategy: format!("{:?}", blueprint.cohort.alignment()),
            center_point_policy: format!("{:?}", blueprint.effective_center_point_policy()),
            center_radius_s: blueprint.alignment.center_radius_s,
            recording_epoch_min_year: epoch.enabled.then_some(epoch.min_year),
        },
        tables,
        sources,
        sinks,
        output_dir: blueprint.output.dir.display().to_string(),
        pool_size: blueprint.output.pool_size,
    }
}

fn print_config_info(blueprint: &CurationBlueprint, args: &InfoArgs) {
    println!("=== Segment Curator Configuration ===\n");

    println!("Run");
    println!("   Version: {:?}", blueprint.version);
    println!("   Cohort: {}", blueprint.cohort.as_str());
    println!("   Regime: {}", blueprint.regime.as_str());
    println!("   Alignment: {:?}", blueprint.cohort.alignment());
    println!(
        "   Center points: {:?} (radius {} s)",
        blueprint.effective_center_point_policy(),
        blueprint.alignment.center_radius_s
    );
    let epoch = &blueprint.alignment.recording_epoch;
    if epoch.enabled {
        println!("   Recording epoch: from {}", epoch.min_year);
    } else {
        println!("   Recording epoch: disabled");
    }

    println!("\nTables");
    for kind in TABLE_KINDS {
        if let Some(source) = blueprint.tables.get(kind) {
            println!("   {}: {}", kind.as_str(), source.path.display());
        }
    }

    println!("\nSources ({})", blueprint.sources.len());
    for source in &blueprint.sources {
        println!(
            "   {} -> {}_{}",
            source.id, source.device, source.measurement
        );
        if args.sources {
            println!("      dir: {}", source.dir.display());
            println!("      prefix: {} ({:?})", source.prefix, source.file_layout);
            println!("      time: {} ({:?})", source.time_column, source.time_axis);
            if let Some(ref location) = source.location_column {
                println!("      location column: {}", location);
            }
            println!("      channels: {}", source.channels.join(", "));
        }
    }

    if args.sinks && !blueprint.output.sinks.is_empty() {
        println!("\nSinks ({})", blueprint.output.sinks.len());
        for sink in &blueprint.output.sinks {
            println!("   {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!(
        "\nOutput: {} (pool size {})",
        blueprint.output.dir.display(),
        blueprint.output.pool_size
    );
    println!();
}
