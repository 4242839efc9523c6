//! FileSink - writes curation output to disk as CSV tables
//!
//! Layout under `base_path`:
//!
//! ```text
//! boundaries.csv         boundary reference table
//! time_references.csv    per (subject, device) offsets, when present
//! segments.csv           assembled table; pivot cells hold payload paths
//! segments/<file>.csv    one file per non-empty payload
//! summary.json           run counters
//! ```

use contracts::{
    AssembledRow, AssembledTable, Cell, ContractError, CurationOutput, DataSink, SampleSeries,
    Table,
};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

use crate::error::AssemblerError;

/// Directory of per-segment payload files, relative to the base path
pub const PAYLOAD_DIR: &str = "segments";
/// Pivot cell text for an explicit null payload
pub const NULL_MARKER: &str = "null";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Field delimiter of written tables
    pub delimiter: u8,
}

impl FileSinkConfig {
    /// Create config from params map, falling back to `default_dir`
    pub fn from_params(params: &HashMap<String, String>, default_dir: &Path) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_dir.to_path_buf());
        let delimiter = params
            .get("delimiter")
            .and_then(|d| d.bytes().next())
            .unwrap_or(b',');

        Self {
            base_path,
            delimiter,
        }
    }
}

/// Sink that writes curation output to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    files_written: usize,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            files_written: 0,
        })
    }

    /// Create from a sink config params map
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        default_dir: &Path,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params, default_dir);
        Self::new(name, config)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn write_output(&mut self, output: &CurationOutput) -> Result<(), AssemblerError> {
        let base = self.config.base_path.clone();

        self.write_table(&base.join("boundaries.csv"), &output.boundaries.to_table()?)?;
        if let Some(references) = &output.time_references {
            self.write_table(&base.join("time_references.csv"), &references.to_table()?)?;
        }
        self.write_segments(&base, &output.segments)?;

        let summary_file = File::create(base.join("summary.json"))?;
        serde_json::to_writer_pretty(summary_file, &output.summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.files_written += 1;
        Ok(())
    }

    fn write_table(&mut self, path: &Path, table: &Table) -> Result<(), AssemblerError> {
        let mut writer = self.csv_writer(path)?;
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        self.files_written += 1;
        Ok(())
    }

    fn write_segments(&mut self, base: &Path, table: &AssembledTable) -> Result<(), AssemblerError> {
        let payload_dir = base.join(PAYLOAD_DIR);
        fs::create_dir_all(&payload_dir)?;

        let mut header = vec!["segment_id".to_string(), "subject_id".to_string()];
        if table.has_location {
            header.push("sensor_location".to_string());
        }
        header.extend(table.label_columns.iter().cloned());
        header.extend(table.pivot_columns.iter().map(|c| c.to_string()));

        let mut writer = self.csv_writer(&base.join("segments.csv"))?;
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![
                row.key.segment_id.to_string(),
                row.subject_id.to_string(),
            ];
            if table.has_location {
                record.push(row.key.location.clone().unwrap_or_default());
            }
            record.extend(row.labels.iter().map(|l| l.clone().unwrap_or_default()));

            for (column, cell) in table.pivot_columns.iter().zip(&row.cells) {
                let text = match cell {
                    Cell::Series(series) => {
                        let file_name = payload_file_name(row, &column.to_string());
                        self.write_payload(&payload_dir.join(&file_name), series)?;
                        format!("{PAYLOAD_DIR}/{file_name}")
                    }
                    Cell::Null => NULL_MARKER.to_string(),
                    Cell::Absent => String::new(),
                };
                record.push(text);
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        self.files_written += 1;
        Ok(())
    }

    fn write_payload(&mut self, path: &Path, series: &SampleSeries) -> Result<(), AssemblerError> {
        let mut writer = self.csv_writer(path)?;
        let mut header = vec!["time".to_string()];
        header.extend(series.channels.iter().cloned());
        writer.write_record(&header)?;
        for sample in &series.samples {
            let mut record = Vec::with_capacity(sample.values.len() + 1);
            record.push(sample.time.to_string());
            record.extend(sample.values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        self.files_written += 1;
        Ok(())
    }

    fn csv_writer(&self, path: &Path) -> Result<csv::Writer<File>, AssemblerError> {
        Ok(csv::WriterBuilder::new()
            .delimiter(self.config.delimiter)
            .from_path(path)?)
    }

    fn persist(&mut self, output: &CurationOutput) -> Result<(), ContractError> {
        self.write_output(output).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

/// `<segment_id>[_<location>]_<column>.csv`
fn payload_file_name(row: &AssembledRow, column: &str) -> String {
    let segment_id = file_name_part(row.key.segment_id.as_str());
    let column = file_name_part(column);
    match &row.key.location {
        Some(location) => format!("{segment_id}_{}_{column}.csv", file_name_part(location)),
        None => format!("{segment_id}_{column}.csv"),
    }
}

/// Keep `[A-Za-z0-9_-]`; anything else becomes `_`.
fn file_name_part(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, output),
        fields(sink = %self.name, rows = output.segments.len())
    )]
    async fn write(&mut self, output: &CurationOutput) -> Result<(), ContractError> {
        self.persist(output)?;
        metrics::counter!("curation_files_written_total", "sink" => self.name.clone())
            .increment(self.files_written as u64);
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, files = self.files_written, "FileSink closed");
        Ok(())
    }
}
