pub mod batch;
pub mod columns;
pub mod config;
pub mod data_models;
pub mod errors;
pub mod file_processor;
pub mod metrics;
pub mod output;
pub mod parallel;
pub mod parsers;
pub mod psychrometrics;
pub mod utils;
pub mod validation;

pub use data_models::{DerivedQuantities, DewPointSource, Observation};
pub use errors::{PsychroError, RowError};
pub use psychrometrics::{AtmosphericState, PsychrometricModel};
