//! Pipeline orchestrator - coordinates all components.
//!
//! Reference tables are resolved before any worker starts. Sensor files are
//! then processed on a bounded pool: each worker aligns every file of one
//! (source, subject), joins the monthly pieces of each stream and segments
//! them once. Workers share no mutable state; outputs are merged afterwards.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use assembler::{Publisher, SegmentAssembler};
use contracts::{
    AlignmentStrategy, Boundary, BoundarySet, CurationBlueprint, CurationOutput, RunSummary,
    Segment, SensorStream, SourceConfig, StreamKey, SubjectId, TableKind, TimeReferenceTable,
};
use ingestion::{
    discover_files, read_table_source, AlignOutcome, RelevanceIndex, SensorFile, StreamAligner,
};
use observability::{
    record_file_processed, record_run_summary, record_stage_duration_ms, CurationMetricsAggregator,
};
use resolver::{BoundaryResolver, BoundaryTables, TimeReferenceResolver};
use segmenter::{Segmenter, SegmenterConfig};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated run configuration, CLI overrides applied
    pub blueprint: CurationBlueprint,
}

/// Read-only lookups shared by every file worker
struct RunContext {
    boundaries: BoundarySet,
    references: TimeReferenceTable,
    strategy: AlignmentStrategy,
    segmenter: Segmenter,
}

impl RunContext {
    fn aligner(&self) -> StreamAligner<'_> {
        match self.strategy {
            AlignmentStrategy::ReferenceNative => StreamAligner::reference_native(),
            AlignmentStrategy::DeviceOffset => StreamAligner::device_offset(&self.references),
        }
    }
}

/// Files of one subject within one source
#[derive(Debug)]
struct FileGroup {
    source_idx: usize,
    subject_id: SubjectId,
    files: Vec<SensorFile>,
}

/// What one worker produced for one file group
#[derive(Debug, Default)]
struct GroupOutcome {
    segments: Vec<Segment>,
    summary: RunSummary,
}

/// Main pipeline orchestrator
pub struct CurationPipeline {
    config: PipelineConfig,
}

impl CurationPipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    #[instrument(
        name = "pipeline_run",
        skip_all,
        fields(
            cohort = self.config.blueprint.cohort.as_str(),
            regime = self.config.blueprint.regime.as_str(),
        )
    )]
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = Arc::new(self.config.blueprint);
        let mut aggregator = CurationMetricsAggregator::new();

        // Resolve reference tables
        let stage = Instant::now();
        let resolve_blueprint = Arc::clone(&blueprint);
        let (context, prepared) = tokio::task::spawn_blocking(move || prepare(&resolve_blueprint))
            .await
            .map_err(|e| CliError::worker(e.to_string()))??;
        record_stage_duration_ms("resolve", stage.elapsed().as_secs_f64() * 1000.0);
        aggregator.update(&prepared);
        aggregator.observe_references(&context.references);
        let context = Arc::new(context);

        // Discover relevant files
        let index = RelevanceIndex::from_boundaries(
            &context.boundaries,
            blueprint.alignment.center_radius_s,
        );
        let mut groups: BTreeMap<(usize, SubjectId), Vec<SensorFile>> = BTreeMap::new();
        for (source_idx, source) in blueprint.sources.iter().enumerate() {
            if !source.dir.is_dir() {
                return Err(CliError::source_dir(&source.id, &source.dir).into());
            }
            let discovered = discover_files(source)
                .with_context(|| format!("Failed to list files of source '{}'", source.id))?;
            let total = discovered.len();
            let relevant = index.filter(discovered);
            info!(
                source = %source.id,
                files = total,
                relevant = relevant.len(),
                "Sensor files discovered"
            );
            for file in relevant {
                groups
                    .entry((source_idx, file.name.subject_id.clone()))
                    .or_default()
                    .push(file);
            }
        }
        let work: Vec<FileGroup> = groups
            .into_iter()
            .map(|((source_idx, subject_id), files)| FileGroup {
                source_idx,
                subject_id,
                files,
            })
            .collect();

        // Align and segment on the worker pool
        let stage = Instant::now();
        let pool_size = blueprint.output.pool_size.max(1);
        let outcomes = run_workers(&blueprint, &context, work, pool_size).await?;
        record_stage_duration_ms("segment", stage.elapsed().as_secs_f64() * 1000.0);

        let mut segments = Vec::new();
        for outcome in outcomes {
            aggregator.update(&outcome.summary);
            for segment in &outcome.segments {
                aggregator.observe_segment(segment);
            }
            segments.extend(outcome.segments);
        }

        // Assemble and publish
        let stage = Instant::now();
        let assembler = SegmentAssembler::from_blueprint(&blueprint);
        let table = assembler.assemble(&context.boundaries, segments);
        info!(rows = table.len(), "Segment table assembled");

        let output = CurationOutput {
            regime: blueprint.regime,
            boundaries: context.boundaries.clone(),
            time_references: (context.strategy == AlignmentStrategy::DeviceOffset)
                .then(|| context.references.clone()),
            segments: table,
            summary: aggregator.run.clone(),
        };
        let rows = output.segments.len();

        let publisher = Publisher::from_configs(&blueprint.output.sinks, &blueprint.output.dir)
            .context("Failed to create sinks")?;
        let active_sinks = publisher.sink_count();
        publisher
            .publish(output)
            .await
            .context("Failed to write curation output")?;
        record_stage_duration_ms("publish", stage.elapsed().as_secs_f64() * 1000.0);

        record_run_summary(&aggregator.run);

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            rows,
            active_sinks,
            pool_size,
            metrics: aggregator,
        };
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rows = stats.rows,
            "Pipeline finished"
        );
        Ok(stats)
    }
}

/// Load clinical tables and resolve references and boundaries.
///
/// Any unreadable or malformed source table is fatal.
fn prepare(blueprint: &CurationBlueprint) -> Result<(RunContext, RunSummary)> {
    let mut summary = RunSummary::default();
    let strategy = blueprint.cohort.alignment();

    let mut tables = BoundaryTables::default();
    for &kind in blueprint.regime.required_tables() {
        if kind == TableKind::VideoDeviceSync {
            continue;
        }
        tables.insert(kind, load_table(blueprint, kind)?);
    }

    let references = match strategy {
        AlignmentStrategy::DeviceOffset => {
            let calibration = load_table(blueprint, TableKind::VideoDeviceSync)?;
            let resolution = TimeReferenceResolver::new(blueprint.alignment.recording_epoch)
                .resolve(&calibration)
                .context("Failed to resolve time references")?;
            summary.references_resolved = resolution.references.len();
            summary.reference_discards = resolution.discards;
            info!(
                references = resolution.references.len(),
                discarded = summary.reference_discards.total(),
                "Time references resolved"
            );
            resolution.references
        }
        AlignmentStrategy::ReferenceNative => TimeReferenceTable::new(),
    };

    let resolution = BoundaryResolver::from_blueprint(blueprint)
        .resolve(&tables)
        .context("Failed to resolve boundaries")?;
    summary.boundaries_resolved = resolution.boundaries.len();
    summary.reserved_slots = resolution.boundaries.reserved().len();
    summary.boundary_discards = resolution.discards;
    info!(
        boundaries = resolution.boundaries.len(),
        discarded = summary.boundary_discards.total(),
        "Boundaries resolved"
    );

    let context = RunContext {
        boundaries: resolution.boundaries,
        references,
        strategy,
        segmenter: Segmenter::new(SegmenterConfig::from_blueprint(blueprint)),
    };
    Ok((context, summary))
}

fn load_table(blueprint: &CurationBlueprint, kind: TableKind) -> Result<contracts::Table> {
    let source = blueprint
        .tables
        .get(kind)
        .with_context(|| format!("Table '{}' is not configured", kind.as_str()))?;
    read_table_source(source, kind)
        .with_context(|| format!("Failed to read table '{}'", kind.as_str()))
}

/// Process file groups on at most `pool_size` blocking workers.
///
/// A failing file is logged and counted; sibling files keep going.
async fn run_workers(
    blueprint: &Arc<CurationBlueprint>,
    context: &Arc<RunContext>,
    work: Vec<FileGroup>,
    pool_size: usize,
) -> Result<Vec<GroupOutcome>> {
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let mut workers = JoinSet::new();
    info!(groups = work.len(), pool_size, "Starting file workers");

    for group in work {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("Worker pool closed")?;
        let blueprint = Arc::clone(blueprint);
        let context = Arc::clone(context);
        workers.spawn_blocking(move || {
            let _permit = permit;
            process_group(&context, &blueprint.sources[group.source_idx], &group)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = workers.join_next().await {
        outcomes.push(joined.map_err(|e| CliError::worker(e.to_string()))?);
    }
    Ok(outcomes)
}

/// Align every file of a group, join pieces of the same stream and cut the
/// joined streams against the subject's boundaries.
///
/// Files are only counted as loaded once read. A group without a time
/// reference counts as one unaligned stream and nothing is read.
fn process_group(context: &RunContext, source: &SourceConfig, group: &FileGroup) -> GroupOutcome {
    let mut outcome = GroupOutcome::default();
    let aligner = context.aligner();
    let mut streams: BTreeMap<StreamKey, SensorStream> = BTreeMap::new();

    for file in &group.files {
        match aligner.align(source, file) {
            Ok(AlignOutcome::Aligned(aligned)) => {
                record_file_processed(&source.id, true);
                outcome.summary.files_loaded += 1;
                for stream in aligned {
                    match streams.entry(stream.key.clone()) {
                        Entry::Occupied(mut joined) => joined.get_mut().append(stream),
                        Entry::Vacant(slot) => {
                            slot.insert(stream);
                        }
                    }
                }
            }
            Ok(AlignOutcome::NotAlignable { .. }) => {
                // Every file of the group shares the missing (subject, device) reference
                outcome.summary.streams_unaligned = 1;
                return outcome;
            }
            Err(e) => {
                warn!(
                    source = %source.id,
                    path = %file.path.display(),
                    error = %e,
                    "File failed"
                );
                record_file_processed(&source.id, false);
                outcome.summary.files_failed += 1;
            }
        }
    }

    let own: Vec<&Boundary> = context
        .boundaries
        .boundaries()
        .iter()
        .filter(|b| b.subject_id == group.subject_id)
        .collect();
    for stream in streams.into_values() {
        outcome.summary.streams_aligned += 1;
        let batch = context.segmenter.segment(&stream, own.iter().copied());
        outcome.summary.segments_emitted += batch.emitted();
        outcome.summary.null_segments += batch.null_payloads;
        outcome.summary.no_match_skips += batch.no_match;
        outcome.segments.extend(batch.segments);
    }
    debug!(
        source = %source.id,
        subject_id = %group.subject_id,
        files = group.files.len(),
        segments = outcome.segments.len(),
        "File group processed"
    );
    outcome
}
