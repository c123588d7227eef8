use crate::columns::{normalize_header, ColumnMap};
use crate::config::PipelineConfig;
use crate::data_models::RawRow;
use crate::errors::ParseError;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Rows of one station export, still as raw text.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub columns: ColumnMap,
    pub rows: Vec<RawRow>,
    /// Records the CSV reader could not decode (bad quoting, invalid UTF-8).
    pub unreadable_rows: usize,
}

pub fn parse_hourly_csv(config: &PipelineConfig, file_path: &Path) -> Result<ParsedFile, ParseError> {
    debug!("Opening hourly export {}", file_path.display());
    let file = File::open(file_path).map_err(|e| ParseError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    parse_hourly_reader(config, file, file_path)
}

/// Parses an hourly export from any reader; `source` is only used for
/// error messages and logs.
pub fn parse_hourly_reader<R: Read>(
    config: &PipelineConfig,
    input: R,
    source: &Path,
) -> Result<ParsedFile, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter_byte()?)
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = reader.records();

    // --- Locate the header record (title lines precede it in station exports) ---
    let mut record_index = 0;
    let headers = loop {
        match records.next() {
            Some(Ok(record)) if record_index == config.header_row => break record,
            Some(Ok(_)) => record_index += 1,
            Some(Err(e)) if record_index == config.header_row => {
                return Err(ParseError::HeaderReadError {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
            Some(Err(e)) => {
                debug!("Ignoring unreadable preamble record in {}: {}", source.display(), e);
                record_index += 1;
            }
            None => {
                return Err(ParseError::MissingHeader {
                    path: source.to_path_buf(),
                    line: config.header_row,
                });
            }
        }
    };

    let columns = ColumnMap::from_headers(headers.iter().map(normalize_header));
    if columns.time.is_none() {
        return Err(ParseError::MissingColumn {
            path: source.to_path_buf(),
            column: "time",
        });
    }
    let missing = columns.missing();
    if !missing.is_empty() {
        debug!("{}: no column for {:?}, defaults apply", source.display(), missing);
    }

    // --- Data rows ---
    let mut parsed = ParsedFile {
        columns,
        ..Default::default()
    };

    for result in records {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable record in {}: {}", source.display(), e);
                parsed.unreadable_rows += 1;
                continue;
            }
        };
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row_number = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(0);
        let columns = &parsed.columns;
        parsed.rows.push(RawRow {
            row_number,
            time: cell(&record, columns.time),
            temperature: cell(&record, columns.temperature),
            relative_humidity: cell(&record, columns.relative_humidity),
            pressure: cell(&record, columns.pressure),
            dew_point: cell(&record, columns.dew_point),
            solar: cell(&record, columns.solar),
            wind: cell(&record, columns.wind),
        });
    }

    debug!(
        "Finished parsing {}: {} rows, {} unreadable",
        source.display(),
        parsed.rows.len(),
        parsed.unreadable_rows
    );
    Ok(parsed)
}

// Short records yield an empty cell rather than an absent column.
fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index.map(|i| record.get(i).unwrap_or("").trim().to_string())
}
