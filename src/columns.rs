//! Maps the heterogeneous column headers of station exports onto the fields
//! the pipeline understands.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Time,
    DewPoint,
    Temperature,
    Solar,
    RelativeHumidity,
    Wind,
    Pressure,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Time => "time",
            Field::DewPoint => "dew_point",
            Field::Temperature => "temperature",
            Field::Solar => "solar",
            Field::RelativeHumidity => "relative_humidity",
            Field::Wind => "wind",
            Field::Pressure => "pressure",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct HeaderRule {
    field: Field,
    /// Substrings matched verbatim (source-language headers, acronyms).
    exact: &'static [&'static str],
    /// Lowercase substrings matched against the lowercased header.
    folded: &'static [&'static str],
}

// Evaluated top to bottom; dew point precedes temperature so that
// "露點溫度" / "Dew Point Temperature" is not taken for air temperature.
const HEADER_RULES: &[HeaderRule] = &[
    HeaderRule {
        field: Field::Time,
        exact: &["時間"],
        folded: &["time"],
    },
    HeaderRule {
        field: Field::DewPoint,
        exact: &["露點", "Td"],
        folded: &["dew"],
    },
    HeaderRule {
        field: Field::Temperature,
        exact: &["氣溫", "溫度", "温度"],
        folded: &["temperature", "temp"],
    },
    HeaderRule {
        field: Field::Solar,
        exact: &["日射"],
        folded: &["solar", "radiation", "globlrad"],
    },
    HeaderRule {
        field: Field::RelativeHumidity,
        exact: &["濕度", "溼度", "湿度", "RH"],
        folded: &["humidity"],
    },
    HeaderRule {
        field: Field::Wind,
        exact: &["風速"],
        folded: &["wind"],
    },
    HeaderRule {
        field: Field::Pressure,
        exact: &["氣壓"],
        folded: &["pressure", "pres"],
    },
];

/// Returns the field a header names, or `None` for columns the pipeline drops.
pub fn classify_header(header: &str) -> Option<Field> {
    let header = normalize_header(header);
    let folded = header.to_lowercase();
    HEADER_RULES
        .iter()
        .find(|rule| {
            rule.exact.iter().any(|k| header.contains(k))
                || rule.folded.iter().any(|k| folded.contains(k))
        })
        .map(|rule| rule.field)
}

/// Trims whitespace and a leading UTF-8 byte order mark.
pub fn normalize_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

/// Column index per recognized field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub time: Option<usize>,
    pub dew_point: Option<usize>,
    pub temperature: Option<usize>,
    pub solar: Option<usize>,
    pub relative_humidity: Option<usize>,
    pub wind: Option<usize>,
    pub pressure: Option<usize>,
}

impl ColumnMap {
    /// Resolves headers left to right; the first column claiming a field keeps it.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut map = ColumnMap::default();
        for (index, header) in headers.into_iter().enumerate() {
            if let Some(field) = classify_header(header) {
                let slot = map.slot_mut(field);
                if slot.is_none() {
                    *slot = Some(index);
                }
            }
        }
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Time => self.time,
            Field::DewPoint => self.dew_point,
            Field::Temperature => self.temperature,
            Field::Solar => self.solar,
            Field::RelativeHumidity => self.relative_humidity,
            Field::Wind => self.wind,
            Field::Pressure => self.pressure,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Time => &mut self.time,
            Field::DewPoint => &mut self.dew_point,
            Field::Temperature => &mut self.temperature,
            Field::Solar => &mut self.solar,
            Field::RelativeHumidity => &mut self.relative_humidity,
            Field::Wind => &mut self.wind,
            Field::Pressure => &mut self.pressure,
        }
    }

    /// Fields that did not match any header.
    pub fn missing(&self) -> Vec<Field> {
        [
            Field::Time,
            Field::DewPoint,
            Field::Temperature,
            Field::Solar,
            Field::RelativeHumidity,
            Field::Wind,
            Field::Pressure,
        ]
        .into_iter()
        .filter(|field| self.get(*field).is_none())
        .collect()
    }
}
