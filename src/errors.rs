use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// --- Model Errors ---

/// Failures raised by the psychrometric formulas themselves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PsychroError {
    #[error("Invalid input for {quantity}: {value} ({reason})")]
    InvalidInput {
        quantity: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("Ambient pressure {pressure_kpa} kPa does not exceed vapor pressure {vapor_pressure_kpa} kPa")]
    PhysicallyInconsistentState {
        pressure_kpa: f64,
        vapor_pressure_kpa: f64,
    },
}

impl PsychroError {
    pub(crate) fn invalid(quantity: &'static str, value: f64, reason: &'static str) -> Self {
        PsychroError::InvalidInput {
            quantity,
            value,
            reason,
        }
    }
}

// --- Row Errors ---

/// Why a single observation row was not turned into a derived record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("Column '{column}' value '{value}' is not numeric")]
    Parse { column: String, value: String },
    #[error("Required value for '{field}' is missing")]
    MissingValue { field: &'static str },
    #[error("Timestamp '{value}' matches none of the configured formats")]
    Timestamp { value: String },
    #[error("Timestamp cell is empty")]
    MissingTimestamp,
    #[error("Derivation failed: {0}")]
    Physics(#[from] PsychroError),
}

impl RowError {
    /// Short stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::Parse { .. } => "parse",
            RowError::MissingValue { .. } => "missing_value",
            RowError::Timestamp { .. } | RowError::MissingTimestamp => "timestamp",
            RowError::Physics(PsychroError::InvalidInput { .. }) => "invalid_input",
            RowError::Physics(PsychroError::PhysicallyInconsistentState { .. }) => "inconsistent_state",
        }
    }
}

// --- File Errors ---

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading data file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error reading CSV headers in {path}: {source}")]
    HeaderReadError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("No header row found in {path} (expected at line {line})")]
    MissingHeader { path: PathBuf, line: usize },
    #[error("Required column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration parsing failed: {0}")]
    ConfigParse(#[from] ConfigError),
    #[error("Parsing failed for {1}: {0}")]
    Parse(ParseError, PathBuf),
    #[error("Row {row} in {path} aborted the file: {source}")]
    RowAborted {
        path: PathBuf,
        row: usize,
        #[source]
        source: RowError,
    },
    #[error("Failed to write output {path}: {source}")]
    OutputError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("IO error for {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No input files matched {0:?}")]
    NoInputs(Vec<String>),
    #[error("Output {output} would be written by several inputs: {inputs:?}")]
    OutputCollision { output: PathBuf, inputs: Vec<PathBuf> },
}
