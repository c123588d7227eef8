use crate::errors::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What the ingestion layer does when a single row cannot be derived.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RowErrorPolicy {
    /// Log the row, count it and continue with the rest of the file.
    #[default]
    Skip,
    /// Fail the whole file on the first bad row.
    Abort,
}

/// Values substituted when a file has no column for a field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldDefaults {
    pub temperature_c: f64,
    pub relative_humidity_pct: f64,
    pub pressure_hpa: f64,
    pub solar: f64,
    pub wind: f64,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            relative_humidity_pct: 80.0,
            pressure_hpa: 1013.25,
            solar: 0.0,
            wind: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 0-based line holding the column headers. Station exports carry a
    /// title line first, hence 1.
    pub header_row: usize,
    pub delimiter: char,
    /// Cell contents treated as missing (compared after trimming).
    pub null_markers: Vec<String>,
    /// chrono formats tried in order for the time column.
    pub timestamp_formats: Vec<String>,
    /// Divides the pressure column to get kPa (hPa -> kPa is 10).
    pub pressure_divisor: f64,
    pub defaults: FieldDefaults,
    pub on_row_error: RowErrorPolicy,
    /// Appended to the input file stem when naming the output file.
    pub output_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_row: 1,
            delimiter: ',',
            null_markers: default_null_markers(),
            timestamp_formats: default_timestamp_formats(),
            pressure_divisor: 10.0,
            defaults: FieldDefaults::default(),
            on_row_error: RowErrorPolicy::Skip,
            output_suffix: "_derived".to_string(),
        }
    }
}

fn default_null_markers() -> Vec<String> {
    ["--", "NA", "NaN", "nan", "X", "/", "..."]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timestamp_formats() -> Vec<String> {
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delimiter_byte()?;
        if !self.pressure_divisor.is_finite() || self.pressure_divisor <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pressure_divisor".to_string(),
                message: format!("{} must be finite and positive", self.pressure_divisor),
            });
        }
        if !self.defaults.pressure_hpa.is_finite() || self.defaults.pressure_hpa <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "defaults.pressure_hpa".to_string(),
                message: format!("{} must be finite and positive", self.defaults.pressure_hpa),
            });
        }
        if self.timestamp_formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "timestamp_formats".to_string(),
                message: "at least one format is required".to_string(),
            });
        }
        Ok(())
    }

    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "delimiter".to_string(),
                message: format!("'{}' is not an ASCII character", self.delimiter),
            })
    }

    /// Default pressure converted to kPa.
    pub fn default_pressure_kpa(&self) -> f64 {
        self.defaults.pressure_hpa / 10.0
    }
}

/// Loads and validates a JSON configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: PipelineConfig =
        serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
    config.validate()?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);

    Ok(config)
}
