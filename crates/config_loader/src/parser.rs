//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, CurationBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<CurationBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<CurationBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<CurationBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BoundaryRegime, Cohort, Device, FileLayout, Measurement, TimeAxis};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
cohort = "real_pd"
regime = "home_on_off"

[tables.home_timestamps]
path = "tables/home.csv"
delimiter = ";"

[tables.video_device_sync]
path = "tables/sync.csv"

[[sources]]
id = "watch_accel"
dir = "raw/watch_accel"
prefix = "watch_accel"
device = "smartwatch"
measurement = "accelerometer"
file_layout = "subject_year_month"
time_axis = "milliseconds"
channels = ["x", "y", "z"]
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.cohort, Cohort::RealPd);
        assert_eq!(bp.regime, BoundaryRegime::HomeOnOff);
        assert_eq!(
            bp.tables.home_timestamps.as_ref().map(|t| t.delimiter),
            Some(';')
        );
        let source = &bp.sources[0];
        assert_eq!(source.device, Device::Smartwatch);
        assert_eq!(source.measurement, Measurement::Accelerometer);
        assert_eq!(source.file_layout, FileLayout::SubjectYearMonth);
        assert_eq!(source.time_axis, TimeAxis::Milliseconds);
        assert_eq!(source.time_column, "Timestamp");
        assert_eq!(bp.alignment.center_radius_s, 600.0);
        assert_eq!(bp.output.pool_size, 4);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "cohort": "cis_pd",
            "regime": "motor_task",
            "tables": { "motor_tasks": { "path": "tables/tasks.csv" } },
            "sources": [{
                "id": "patch_accel",
                "dir": "raw/patch",
                "prefix": "Table",
                "device": "wearable_patch",
                "measurement": "accelerometer",
                "location_column": "Location",
                "channels": ["x", "y", "z"]
            }],
            "output": { "dir": "out", "sinks": [{ "name": "log", "sink_type": "log" }] }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.sources[0].location_column.as_deref(), Some("Location"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_cohort() {
        let content = r#"
cohort = "somewhere_else"
regime = "home_on_off"
sources = []
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
