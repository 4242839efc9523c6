//! Sensor file discovery
//!
//! Raw files are named `<prefix>_<subject>.csv` or
//! `<prefix>_<subject>_<YYYY-MM>.csv`. The name alone decides whether a file
//! can hold samples for any resolved boundary, so irrelevant files are never
//! opened.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use contracts::time::seconds_to_datetime;
use contracts::{BoundarySet, FileLayout, SourceConfig, SubjectId};
use chrono::Datelike;
use tracing::{debug, warn};

use crate::error::{IngestionError, Result};

/// Calendar month of a monthly recording file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month containing an epoch-seconds instant (UTC).
    pub fn from_seconds(seconds: f64) -> Option<Self> {
        let dt = seconds_to_datetime(seconds)?;
        Self::new(dt.year(), dt.month())
    }

    /// Parse `YYYY-MM`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Identity encoded in a sensor file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFileName {
    pub subject_id: SubjectId,
    pub year_month: Option<YearMonth>,
}

impl SensorFileName {
    /// Parse a file name under the given prefix and layout.
    pub fn parse(file_name: &str, prefix: &str, layout: FileLayout) -> Result<Self> {
        let stem = file_name
            .strip_suffix(".csv")
            .or_else(|| file_name.strip_suffix(".CSV"))
            .ok_or_else(|| IngestionError::file_name(file_name, "expected a .csv file"))?;
        let rest = stem
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('_'))
            .ok_or_else(|| {
                IngestionError::file_name(file_name, format!("expected prefix '{prefix}_'"))
            })?;

        let (subject, year_month) = match layout {
            FileLayout::Subject => (rest, None),
            FileLayout::SubjectYearMonth => {
                let (subject, month) = rest.rsplit_once('_').ok_or_else(|| {
                    IngestionError::file_name(file_name, "expected '<subject>_<YYYY-MM>'")
                })?;
                let month = YearMonth::parse(month).ok_or_else(|| {
                    IngestionError::file_name(file_name, format!("bad year-month '{month}'"))
                })?;
                (subject, Some(month))
            }
        };

        let subject_id = SubjectId::parse(subject)
            .ok_or_else(|| IngestionError::file_name(file_name, "empty subject id"))?;
        Ok(Self {
            subject_id,
            year_month,
        })
    }
}

/// One raw file of a source
#[derive(Debug, Clone)]
pub struct SensorFile {
    pub path: PathBuf,
    pub name: SensorFileName,
}

/// List the files of a source whose names follow its layout.
///
/// Files carrying the prefix but not the layout are logged and skipped.
pub fn discover_files(source: &SourceConfig) -> Result<Vec<SensorFile>> {
    let entries = std::fs::read_dir(&source.dir).map_err(|e| IngestionError::io(&source.dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestionError::io(&source.dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(source.prefix.as_str()) {
            continue;
        }
        match SensorFileName::parse(file_name, &source.prefix, source.file_layout) {
            Ok(name) => files.push(SensorFile {
                path: path.clone(),
                name,
            }),
            Err(e) => warn!(source = %source.id, error = %e, "skipping sensor file"),
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(source = %source.id, files = files.len(), "sensor files discovered");
    Ok(files)
}

/// Subjects and months touched by the resolved boundaries
#[derive(Debug, Clone, Default)]
pub struct RelevanceIndex {
    months: HashMap<SubjectId, BTreeSet<YearMonth>>,
}

impl RelevanceIndex {
    /// Index every boundary window. The months of both window ends are
    /// recorded so windows crossing a month edge reach both files.
    pub fn from_boundaries(boundaries: &BoundarySet, center_radius_s: f64) -> Self {
        let mut months: HashMap<SubjectId, BTreeSet<YearMonth>> = HashMap::new();
        for boundary in boundaries.boundaries() {
            let (start, end) = boundary.window.range(center_radius_s);
            let entry = months.entry(boundary.subject_id.clone()).or_default();
            entry.extend(YearMonth::from_seconds(start));
            entry.extend(YearMonth::from_seconds(end));
        }
        Self { months }
    }

    pub fn subjects(&self) -> usize {
        self.months.len()
    }

    /// Whether a file can hold samples for at least one boundary.
    pub fn is_relevant(&self, name: &SensorFileName) -> bool {
        match (self.months.get(&name.subject_id), name.year_month) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(months), Some(month)) => months.contains(&month),
        }
    }

    /// Keep only relevant files.
    pub fn filter(&self, files: Vec<SensorFile>) -> Vec<SensorFile> {
        files
            .into_iter()
            .filter(|f| self.is_relevant(&f.name))
            .collect()
    }
}
