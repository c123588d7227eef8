use crate::batch::{derive_batch, BatchOutcome};
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::metrics::METRICS;
use crate::output::write_hourly_csv;
use crate::parsers::hourly_csv::parse_hourly_csv;
use log::info;
use std::path::{Path, PathBuf};

/// What processing one export produced.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub rows_read: usize,
    pub unreadable_rows: usize,
    pub batch: BatchOutcome,
}

/// Parses one hourly export, derives every row and, when `output_file` is
/// given, writes the derived CSV there.
pub fn process_file(
    input: &Path,
    config: &PipelineConfig,
    output_file: Option<&Path>,
) -> Result<FileOutcome, PipelineError> {
    info!("Processing hourly export: {}", input.display());

    let parsed = parse_hourly_csv(config, input)
        .map_err(|parse_err| PipelineError::Parse(parse_err, input.to_path_buf()))?;
    METRICS.lock().record_unreadable_rows(parsed.unreadable_rows as u64);

    let batch = match derive_batch(&parsed.rows, config) {
        Ok(batch) => batch,
        Err(failure) => {
            METRICS.lock().record_row_skipped(failure.error.kind());
            return Err(PipelineError::RowAborted {
                path: input.to_path_buf(),
                row: failure.row_number,
                source: failure.error,
            });
        }
    };

    {
        let mut metrics = METRICS.lock();
        for failure in &batch.failures {
            metrics.record_row_skipped(failure.error.kind());
        }
    }

    if let Some(path) = output_file {
        write_hourly_csv(path, &batch.records)?;
        info!("Wrote {} derived rows to {}", batch.records.len(), path.display());
    }

    Ok(FileOutcome {
        path: input.to_path_buf(),
        output_path: output_file.map(Path::to_path_buf),
        rows_read: parsed.rows.len(),
        unreadable_rows: parsed.unreadable_rows,
        batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RowErrorPolicy;
    use std::fs;

    fn skipped(kind: &str) -> u64 {
        METRICS.lock().rows_skipped.get(kind).copied().unwrap_or(0)
    }

    #[test]
    fn test_aborting_row_is_counted_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("C0A520.csv");
        // 0.05 hPa is far below the vapor pressure of the second row.
        fs::write(
            &input,
            "title\nTime,Pressure,Temp,RH\n2024-07-01 00:00,1008,24,70\n2024-07-01 01:00,0.05,24,70\n",
        )
        .unwrap();
        let config = PipelineConfig {
            on_row_error: RowErrorPolicy::Abort,
            ..Default::default()
        };

        let before = skipped("inconsistent_state");
        let err = process_file(&input, &config, None).unwrap_err();

        assert!(matches!(err, PipelineError::RowAborted { row: 4, .. }));
        assert!(skipped("inconsistent_state") >= before + 1);
    }

    #[test]
    fn test_output_written_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("C0A520.csv");
        fs::write(&input, "title\nTime,Temp,RH\n2024-07-01 00:00,24,70\n").unwrap();
        let config = PipelineConfig::default();

        let dry = process_file(&input, &config, None).unwrap();
        assert_eq!(dry.output_path, None);
        assert_eq!(dry.batch.records.len(), 1);

        let target = dir.path().join("out").join("C0A520_derived.csv");
        let written = process_file(&input, &config, Some(&target)).unwrap();
        assert_eq!(written.output_path.as_deref(), Some(target.as_path()));
        assert!(target.exists());
    }
}
