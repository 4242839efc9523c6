//! Raw sensor file reader
//!
//! Parses one delimited sensor file into native-clock streams. Multi-site
//! recordings are split by their location column into one stream per site.

use std::collections::HashMap;
use std::fs::File;

use contracts::time::parse_datetime;
use contracts::{Sample, SensorStream, SourceConfig, StreamKey, SubjectId, TimeAxis};
use tracing::{debug, instrument};

use crate::discovery::SensorFile;
use crate::error::{IngestionError, Result};
use crate::table_reader::{clean_header, csv_reader};

/// Column positions resolved against a file header
struct ColumnMap {
    time: usize,
    channels: Vec<usize>,
    location: Option<usize>,
}

/// Reads raw files of one configured source
#[derive(Debug, Clone, Copy)]
pub struct SensorFileReader<'a> {
    source: &'a SourceConfig,
}

impl<'a> SensorFileReader<'a> {
    pub fn new(source: &'a SourceConfig) -> Self {
        Self { source }
    }

    /// Parse `file` into streams on the file's own clock, one per location.
    ///
    /// Rows with a blank time cell are skipped; blank channel cells become
    /// `NaN`. Samples come back sorted.
    #[instrument(skip(self, file), fields(source = %self.source.id, path = %file.path.display()))]
    pub fn read(&self, file: &SensorFile) -> Result<Vec<SensorStream>> {
        let path = file.path.as_path();
        let handle = File::open(path).map_err(|e| IngestionError::io(path, e))?;
        let mut reader = csv_reader(path, self.source.delimiter)?.from_reader(handle);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IngestionError::csv(path, e))?
            .iter()
            .map(clean_header)
            .collect();
        let columns = self.resolve_columns(&headers, file)?;

        let mut order: Vec<Option<String>> = Vec::new();
        let mut groups: HashMap<Option<String>, Vec<Sample>> = HashMap::new();
        let mut skipped_rows = 0usize;

        for record in reader.records() {
            let record = record.map_err(|e| IngestionError::csv(path, e))?;
            let line = record.position().map_or(0, |p| p.line());
            let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

            let time_raw = cell(columns.time);
            if time_raw.is_empty() {
                skipped_rows += 1;
                continue;
            }
            let time = parse_time(self.source.time_axis, time_raw).ok_or_else(|| {
                IngestionError::ParseFailed {
                    path: path.to_path_buf(),
                    line,
                    message: format!(
                        "'{}' is not a {:?} timestamp",
                        time_raw, self.source.time_axis
                    ),
                }
            })?;

            let mut values = Vec::with_capacity(columns.channels.len());
            for (&idx, name) in columns.channels.iter().zip(&self.source.channels) {
                let raw = cell(idx);
                let value = if raw.is_empty() {
                    f64::NAN
                } else {
                    raw.parse::<f64>().map_err(|_| IngestionError::ParseFailed {
                        path: path.to_path_buf(),
                        line,
                        message: format!("channel '{name}' value '{raw}' is not numeric"),
                    })?
                };
                values.push(value);
            }

            let location = columns
                .location
                .map(|idx| normalize_location(cell(idx)))
                .filter(|loc| !loc.is_empty());
            groups
                .entry(location.clone())
                .or_insert_with(|| {
                    order.push(location);
                    Vec::new()
                })
                .push(Sample::new(time, values));
        }

        let streams: Vec<SensorStream> = order
            .into_iter()
            .filter_map(|location| {
                let samples = groups.remove(&location)?;
                let key = self.stream_key(file.name.subject_id.clone(), location);
                Some(SensorStream::new(key, self.source.channels.clone(), samples))
            })
            .collect();

        let samples: usize = streams.iter().map(SensorStream::len).sum();
        metrics::counter!("curation_samples_read_total", "source" => self.source.id.clone())
            .increment(samples as u64);
        debug!(
            streams = streams.len(),
            samples,
            skipped_rows,
            "sensor file parsed"
        );
        Ok(streams)
    }

    /// Key of a stream read from this source.
    pub fn stream_key(&self, subject_id: SubjectId, location: Option<String>) -> StreamKey {
        StreamKey {
            subject_id,
            device: self.source.device,
            measurement: self.source.measurement,
            location,
        }
    }

    fn resolve_columns(&self, headers: &[String], file: &SensorFile) -> Result<ColumnMap> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| IngestionError::MissingColumn {
                    path: file.path.clone(),
                    column: column.to_string(),
                })
        };
        Ok(ColumnMap {
            time: find(&self.source.time_column)?,
            channels: self
                .source
                .channels
                .iter()
                .map(|c| find(c))
                .collect::<Result<_>>()?,
            location: self
                .source
                .location_column
                .as_deref()
                .map(find)
                .transpose()?,
        })
    }
}

/// Raw time cell to seconds on the file's clock.
pub fn parse_time(axis: TimeAxis, raw: &str) -> Option<f64> {
    match axis {
        TimeAxis::Datetime => parse_datetime(raw),
        TimeAxis::Seconds => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
        TimeAxis::Milliseconds => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|ms| ms / 1000.0),
    }
}

/// Collapse whitespace runs in a location label to single underscores.
pub fn normalize_location(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SensorFileName;
    use contracts::{Device, FileLayout, Measurement};
    use rand::seq::SliceRandom;

    fn source(dir: &std::path::Path, axis: TimeAxis, location: Option<&str>) -> SourceConfig {
        SourceConfig {
            id: "patch_accel".into(),
            dir: dir.to_path_buf(),
            prefix: "patch".into(),
            device: Device::WearablePatch,
            measurement: Measurement::Accelerometer,
            file_layout: FileLayout::Subject,
            time_column: "Timestamp".into(),
            time_axis: axis,
            location_column: location.map(String::from),
            channels: vec!["x".into(), "y".into(), "z".into()],
            delimiter: ',',
        }
    }

    fn sensor_file(dir: &std::path::Path, name: &str, content: &str) -> SensorFile {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        SensorFile {
            path,
            name: SensorFileName {
                subject_id: "1004".into(),
                year_month: None,
            },
        }
    }

    #[test]
    fn test_read_sorts_shuffled_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows: Vec<String> = (0..200)
            .map(|i| format!("{},{i},0,0", i * 20))
            .collect();
        rows.shuffle(&mut rand::rng());
        let content = format!("Timestamp,x,y,z\n{}\n", rows.join("\n"));
        let file = sensor_file(dir.path(), "patch_1004.csv", &content);

        let src = source(dir.path(), TimeAxis::Milliseconds, None);
        let streams = SensorFileReader::new(&src).read(&file).unwrap();
        assert_eq!(streams.len(), 1);
        let stream = &streams[0];
        assert_eq!(stream.len(), 200);
        assert!(stream.is_time_ordered());
        assert_eq!(stream.time_range(), Some((0.0, 3.98)));
        assert_eq!(stream.samples()[1].values[0], 1.0);
    }

    #[test]
    fn test_read_splits_locations() {
        let dir = tempfile::tempdir().unwrap();
        let content = "Timestamp,Location,x,y,z\n\
            2017-06-01 10:00:01,Left  Ankle,1,1,1\n\
            2017-06-01 10:00:00,Right Ankle,2,2,2\n\
            2017-06-01 10:00:00,Left  Ankle,3,3,3\n";
        let file = sensor_file(dir.path(), "patch_1004.csv", content);

        let src = source(dir.path(), TimeAxis::Datetime, Some("Location"));
        let streams = SensorFileReader::new(&src).read(&file).unwrap();
        let locations: Vec<_> = streams
            .iter()
            .map(|s| s.key.location.as_deref().unwrap())
            .collect();
        assert_eq!(locations, vec!["Left_Ankle", "Right_Ankle"]);
        assert_eq!(streams[0].samples()[0].values[0], 3.0);
        assert_eq!(streams[0].key.device, Device::WearablePatch);
    }

    #[test]
    fn test_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let content = "Timestamp,x,y,z\n,1,1,1\n1.5,,2,2\n";
        let file = sensor_file(dir.path(), "patch_1004.csv", content);

        let src = source(dir.path(), TimeAxis::Seconds, None);
        let streams = SensorFileReader::new(&src).read(&file).unwrap();
        assert_eq!(streams[0].len(), 1);
        assert!(streams[0].samples()[0].values[0].is_nan());
    }

    #[test]
    fn test_missing_channel_column() {
        let dir = tempfile::tempdir().unwrap();
        let file = sensor_file(dir.path(), "patch_1004.csv", "Timestamp,x,y\n0,1,1\n");
        let src = source(dir.path(), TimeAxis::Seconds, None);
        let err = SensorFileReader::new(&src).read(&file).unwrap_err();
        assert!(
            matches!(err, IngestionError::MissingColumn { ref column, .. } if column == "z"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_malformed_time_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = sensor_file(dir.path(), "patch_1004.csv", "Timestamp,x,y,z\nsoon,1,1,1\n");
        let src = source(dir.path(), TimeAxis::Datetime, None);
        let err = SensorFileReader::new(&src).read(&file).unwrap_err();
        assert!(matches!(err, IngestionError::ParseFailed { line: 2, .. }), "got {err:?}");
    }

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location(" Left  Upper\tArm "), "Left_Upper_Arm");
    }
}
