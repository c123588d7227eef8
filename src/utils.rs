use chrono::{NaiveDate, NaiveDateTime};

/// Parse a float that may use comma as decimal separator
pub fn parse_locale_float(s: &str) -> Result<f64, std::num::ParseFloatError> {
    s.trim().replace(',', ".").parse::<f64>()
}

/// True when a cell is empty or one of the configured null markers.
pub fn is_null_cell(value: &str, null_markers: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || null_markers.iter().any(|marker| marker == trimmed)
}

/// Parse a local timestamp by trying each format in order.
/// Date-only formats resolve to midnight.
pub fn parse_timestamp(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    })
}

/// Rounds to a fixed number of decimals for presentation.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn formats() -> Vec<String> {
        vec!["%Y-%m-%d %H:%M".to_string(), "%Y/%m/%d".to_string()]
    }

    #[test]
    fn test_parse_locale_float() {
        assert_eq!(parse_locale_float("12,5").unwrap(), 12.5);
        assert_eq!(parse_locale_float(" 1013.2 ").unwrap(), 1013.2);
        assert!(parse_locale_float("abc").is_err());
    }

    #[test]
    fn test_null_cells() {
        let markers = vec!["--".to_string(), "X".to_string()];
        assert!(is_null_cell("  ", &markers));
        assert!(is_null_cell(" -- ", &markers));
        assert!(is_null_cell("X", &markers));
        assert!(!is_null_cell("0", &markers));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2024-07-01 13:00", &formats()).unwrap();
        assert_eq!(ts.hour(), 13);

        let midnight = parse_timestamp("2024/07/02", &formats()).unwrap();
        assert_eq!(
            midnight,
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );

        assert!(parse_timestamp("yesterday", &formats()).is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.2649, 2), 1.26);
        assert_eq!(round_to(16.695, 1), 16.7);
        assert_eq!(round_to(11.8804, 2), 11.88);
    }
}
