//! Turns raw row cells into typed weather records.
//!
//! Column absent from the file -> configured default.
//! Column present, cell empty or a null marker -> default for pressure, solar
//! and wind; row failure for temperature and relative humidity; computed dew
//! point for the dew point column.
//! Column present, cell not numeric -> row failure.

use crate::config::PipelineConfig;
use crate::data_models::{Observation, RawRow, WeatherRecord};
use crate::errors::RowError;
use crate::utils::{is_null_cell, parse_locale_float, parse_timestamp};

enum CellValue {
    Absent,
    Null,
    Number(f64),
}

fn read_cell(
    cell: &Option<String>,
    column: &'static str,
    null_markers: &[String],
) -> Result<CellValue, RowError> {
    match cell {
        None => Ok(CellValue::Absent),
        Some(text) if is_null_cell(text, null_markers) => Ok(CellValue::Null),
        Some(text) => parse_locale_float(text)
            .map(CellValue::Number)
            .map_err(|_| RowError::Parse {
                column: column.to_string(),
                value: text.trim().to_string(),
            }),
    }
}

fn required(
    cell: &Option<String>,
    field: &'static str,
    default: f64,
    null_markers: &[String],
) -> Result<f64, RowError> {
    match read_cell(cell, field, null_markers)? {
        CellValue::Absent => Ok(default),
        CellValue::Null => Err(RowError::MissingValue { field }),
        CellValue::Number(value) => Ok(value),
    }
}

fn optional(
    cell: &Option<String>,
    field: &'static str,
    default: f64,
    null_markers: &[String],
) -> Result<f64, RowError> {
    match read_cell(cell, field, null_markers)? {
        CellValue::Absent | CellValue::Null => Ok(default),
        CellValue::Number(value) => Ok(value),
    }
}

/// Builds a [`WeatherRecord`] from one raw row.
pub fn build_record(raw: &RawRow, config: &PipelineConfig) -> Result<WeatherRecord, RowError> {
    let markers = &config.null_markers;
    let defaults = &config.defaults;

    let timestamp = match &raw.time {
        Some(text) if !is_null_cell(text, markers) => parse_timestamp(text, &config.timestamp_formats)
            .ok_or_else(|| RowError::Timestamp {
                value: text.trim().to_string(),
            })?,
        _ => return Err(RowError::MissingTimestamp),
    };

    let temperature_c = required(&raw.temperature, "temperature", defaults.temperature_c, markers)?;
    let relative_humidity_pct = required(
        &raw.relative_humidity,
        "relative_humidity",
        defaults.relative_humidity_pct,
        markers,
    )?;

    let pressure_kpa = match read_cell(&raw.pressure, "pressure", markers)? {
        CellValue::Absent | CellValue::Null => config.default_pressure_kpa(),
        CellValue::Number(value) => value / config.pressure_divisor,
    };

    let measured_dew_point_c = match read_cell(&raw.dew_point, "dew_point", markers)? {
        CellValue::Absent | CellValue::Null => None,
        CellValue::Number(value) => Some(value),
    };

    let solar = optional(&raw.solar, "solar", defaults.solar, markers)?;
    let wind = optional(&raw.wind, "wind", defaults.wind, markers)?;

    Ok(WeatherRecord {
        row_number: raw.row_number,
        timestamp,
        observation: Observation {
            temperature_c,
            relative_humidity_pct,
            measured_dew_point_c,
        },
        pressure_kpa,
        solar,
        wind,
    })
}
