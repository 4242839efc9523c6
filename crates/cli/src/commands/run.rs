//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::CurationBlueprint;
use segment_curator::{CliError, CurationPipeline, PipelineConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref dir) = args.output_dir {
        info!(dir = %dir.display(), "Overriding output directory from CLI");
        blueprint.output.dir = dir.clone();
    }
    if let Some(pool_size) = args.pool_size {
        info!(pool_size, "Overriding worker pool size from CLI");
        blueprint.output.pool_size = pool_size;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        cohort = blueprint.cohort.as_str(),
        regime = blueprint.regime.as_str(),
        sources = blueprint.sources.len(),
        sinks = blueprint.output.sinks.len(),
        pool_size = blueprint.output.pool_size,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = CurationPipeline::new(PipelineConfig { blueprint });

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Pipeline execution failed")?;
            info!(
                rows = stats.rows,
                files_loaded = stats.metrics.run.files_loaded,
                files_failed = stats.metrics.run.files_failed,
                skipped = stats.total_skipped(),
                duration_secs = stats.duration.as_secs_f64(),
                "Pipeline completed successfully"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Segment Curator finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM. A handler that cannot be installed never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CurationBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Cohort: {}", blueprint.cohort.as_str());
    println!("Regime: {}", blueprint.regime.as_str());
    println!(
        "Center point policy: {:?}",
        blueprint.effective_center_point_policy()
    );
    println!("\nSources ({}):", blueprint.sources.len());
    for source in &blueprint.sources {
        println!(
            "  - {} ({}_{}) in {}",
            source.id,
            source.device,
            source.measurement,
            source.dir.display()
        );
    }

    if !blueprint.output.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.output.sinks.len());
        for sink in &blueprint.output.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nOutput: {}", blueprint.output.dir.display());
    println!();
}
