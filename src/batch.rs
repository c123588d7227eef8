use crate::config::{PipelineConfig, RowErrorPolicy};
use crate::data_models::{DerivedQuantities, RawRow, WeatherRecord};
use crate::errors::RowError;
use crate::psychrometrics::PsychrometricModel;
use crate::validation::build_record;
use log::warn;

/// An input row together with what the model derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub record: WeatherRecord,
    pub derived: DerivedQuantities,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row_number: usize,
    pub error: RowError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<DerivedRecord>,
    pub failures: Vec<RowFailure>,
}

impl BatchOutcome {
    pub fn rows_seen(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Converts and derives a single row with the given model.
pub fn derive_row(
    model: &mut PsychrometricModel,
    raw: &RawRow,
    config: &PipelineConfig,
) -> Result<DerivedRecord, RowError> {
    let record = build_record(raw, config)?;
    model.set_pressure(record.pressure_kpa)?;
    let derived = model.derive(&record.observation)?;
    Ok(DerivedRecord { record, derived })
}

/// Derives every row in order.
///
/// Under [`RowErrorPolicy::Skip`] failed rows are collected and the batch
/// continues; under [`RowErrorPolicy::Abort`] the first failure is returned.
/// A failed row never contributes a record.
pub fn derive_batch(rows: &[RawRow], config: &PipelineConfig) -> Result<BatchOutcome, RowFailure> {
    // One model per batch: set_pressure + derive must not interleave with other workers.
    let mut model = PsychrometricModel::default();
    let mut outcome = BatchOutcome {
        records: Vec::with_capacity(rows.len()),
        failures: Vec::new(),
    };

    for raw in rows {
        match derive_row(&mut model, raw, config) {
            Ok(record) => outcome.records.push(record),
            Err(error) => {
                let failure = RowFailure {
                    row_number: raw.row_number,
                    error,
                };
                if config.on_row_error == RowErrorPolicy::Abort {
                    return Err(failure);
                }
                warn!("Skipping row {}: {}", failure.row_number, failure.error);
                outcome.failures.push(failure);
            }
        }
    }

    Ok(outcome)
}
