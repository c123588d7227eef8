use chrono::NaiveDateTime;
use serde::Serialize;

/// Point-in-time reading handed to the psychrometric model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub temperature_c: f64,
    pub relative_humidity_pct: f64,
    pub measured_dew_point_c: Option<f64>,
}

impl Observation {
    pub fn new(temperature_c: f64, relative_humidity_pct: f64) -> Self {
        Self {
            temperature_c,
            relative_humidity_pct,
            measured_dew_point_c: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DewPointSource {
    Measured,
    Computed,
}

/// Model output for one observation. Humidity ratio is kg/kg here; the g/kg
/// rescale happens when writing output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedQuantities {
    pub partial_vapor_pressure_kpa: f64,
    pub saturation_vapor_pressure_kpa: f64,
    pub vapor_pressure_deficit_kpa: f64,
    pub humidity_ratio_kg_per_kg: f64,
    pub enthalpy_kj_per_kg: f64,
    pub dew_point_c: f64,
    pub dew_point_source: DewPointSource,
}

/// One data row of a station export after header mapping.
///
/// `None` means the file has no column for the field; `Some` holds the raw
/// cell text, which may still be empty or a null marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub row_number: usize, // 1-based line in the source file
    pub time: Option<String>,
    pub temperature: Option<String>,
    pub relative_humidity: Option<String>,
    pub pressure: Option<String>,
    pub dew_point: Option<String>,
    pub solar: Option<String>,
    pub wind: Option<String>,
}

/// A row with typed values and defaults applied, ready for derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub row_number: usize,
    pub timestamp: NaiveDateTime,
    pub observation: Observation,
    pub pressure_kpa: f64,
    pub solar: f64,
    pub wind: f64,
}

/// Output row written per successfully derived observation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HourlyRecord {
    #[serde(rename = "Time", serialize_with = "serialize_timestamp")]
    pub time: NaiveDateTime,
    #[serde(rename = "Temp")]
    pub temperature_c: f64,
    #[serde(rename = "RH")]
    pub relative_humidity_pct: f64,
    #[serde(rename = "Solar")]
    pub solar: f64,
    #[serde(rename = "Wind")]
    pub wind: f64,
    #[serde(rename = "VPD")]
    pub vpd_kpa: f64,
    #[serde(rename = "DewPoint")]
    pub dew_point_c: f64,
    #[serde(rename = "Enthalpy")]
    pub enthalpy_kj_per_kg: f64,
    #[serde(rename = "HumidityRatio")]
    pub humidity_ratio_g_per_kg: f64,
}

fn serialize_timestamp<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&time.format("%Y-%m-%d %H:%M:%S"))
}
