use crate::batch::DerivedRecord;
use crate::data_models::HourlyRecord;
use crate::errors::PipelineError;
use crate::utils::round_to;
use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

const HEADER: [&str; 9] = [
    "Time",
    "Temp",
    "RH",
    "Solar",
    "Wind",
    "VPD",
    "DewPoint",
    "Enthalpy",
    "HumidityRatio",
];

impl From<&DerivedRecord> for HourlyRecord {
    fn from(row: &DerivedRecord) -> Self {
        let observation = &row.record.observation;
        HourlyRecord {
            time: row.record.timestamp,
            temperature_c: observation.temperature_c,
            relative_humidity_pct: observation.relative_humidity_pct,
            solar: row.record.solar,
            wind: row.record.wind,
            vpd_kpa: round_to(row.derived.vapor_pressure_deficit_kpa, 2),
            dew_point_c: round_to(row.derived.dew_point_c, 1),
            enthalpy_kj_per_kg: round_to(row.derived.enthalpy_kj_per_kg, 1),
            humidity_ratio_g_per_kg: round_to(row.derived.humidity_ratio_kg_per_kg * 1000.0, 2),
        }
    }
}

/// `<output_dir>/<relative dirs>/<stem><suffix>.csv` for an input path
/// relative to the root it was discovered under. Root, prefix and `..`
/// components are dropped so the result always stays inside `output_dir`.
pub fn output_path(relative: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let mut path = output_dir.to_path_buf();
    if let Some(parent) = relative.parent() {
        path.extend(parent.components().filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        }));
    }
    path.join(format!("{}{}.csv", stem, suffix))
}

/// Serializes derived rows; the header is written even when there are none.
pub fn write_hourly<W: Write>(writer: W, rows: &[DerivedRecord]) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(writer);
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.serialize(HourlyRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_hourly_csv(path: &Path, rows: &[DerivedRecord]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = File::create(path).map_err(|e| PipelineError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_hourly(file, rows).map_err(|e| PipelineError::OutputError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Observation, WeatherRecord};
    use crate::psychrometrics::{derive, STANDARD_PRESSURE_KPA};
    use chrono::NaiveDate;

    fn sample() -> DerivedRecord {
        let observation = Observation::new(25.0, 60.0);
        DerivedRecord {
            record: WeatherRecord {
                row_number: 3,
                timestamp: NaiveDate::from_ymd_opt(2024, 7, 1)
                    .unwrap()
                    .and_hms_opt(13, 0, 0)
                    .unwrap(),
                observation,
                pressure_kpa: STANDARD_PRESSURE_KPA,
                solar: 2.5,
                wind: 1.2,
            },
            derived: derive(&observation, STANDARD_PRESSURE_KPA).unwrap(),
        }
    }

    #[test]
    fn test_hourly_record_rounding() {
        let hourly = HourlyRecord::from(&sample());
        assert_eq!(hourly.vpd_kpa, 1.27);
        assert_eq!(hourly.dew_point_c, 16.7);
        assert_eq!(hourly.enthalpy_kj_per_kg, 55.4);
        assert_eq!(hourly.humidity_ratio_g_per_kg, 11.88);
    }

    #[test]
    fn test_write_hourly() {
        let mut buffer = Vec::new();
        write_hourly(&mut buffer, &[sample()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Time,Temp,RH,Solar,Wind,VPD,DewPoint,Enthalpy,HumidityRatio"));
        assert_eq!(lines.next(), Some("2024-07-01 13:00:00,25.0,60.0,2.5,1.2,1.27,16.7,55.4,11.88"));
    }

    #[test]
    fn test_write_empty_keeps_header() {
        let mut buffer = Vec::new();
        write_hourly(&mut buffer, &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), format!("{}\n", HEADER.join(",")));
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("C0A520-2024-07.csv"), Path::new("/out"), "_derived");
        assert_eq!(path, PathBuf::from("/out/C0A520-2024-07_derived.csv"));
    }

    #[test]
    fn test_output_path_mirrors_subdirectories() {
        let out = Path::new("/out");
        assert_eq!(
            output_path(Path::new("2023/07/C0A520.csv"), out, "_derived"),
            PathBuf::from("/out/2023/07/C0A520_derived.csv")
        );
        assert_ne!(
            output_path(Path::new("2023/C0A520.csv"), out, "_derived"),
            output_path(Path::new("2024/C0A520.csv"), out, "_derived")
        );
        // Never escapes the output directory.
        assert_eq!(
            output_path(Path::new("/data/../C0A520.csv"), out, "_x"),
            PathBuf::from("/out/data/C0A520_x.csv")
        );
    }
}
