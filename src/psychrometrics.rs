//! Moist-air psychrometrics after ASAE D271.2.
//!
//! Every formula is exposed as a free function that takes ambient pressure
//! explicitly. [`PsychrometricModel`] wraps them for callers that prefer to set
//! the pressure once per observation and then run the derivation chain.
//!
//! Units: temperatures in °C, pressures in kPa, humidity ratio in kg/kg,
//! enthalpy in kJ/kg dry air.

use crate::data_models::{DerivedQuantities, DewPointSource, Observation};
use crate::errors::PsychroError;
use log::debug;

/// Standard sea-level atmospheric pressure (kPa).
pub const STANDARD_PRESSURE_KPA: f64 = 101.325;

/// Lowest temperature accepted by the saturation curve (°C).
pub const MIN_TEMPERATURE_C: f64 = -40.0;
/// Highest temperature accepted by the saturation curve (°C).
pub const MAX_TEMPERATURE_C: f64 = 260.0;

const KELVIN_OFFSET: f64 = 273.15;

// ASAE D271.2 saturation vapor pressure over liquid water, T in K, Ps in Pa:
// ln(Ps / R) = (A + B T + C T^2 + D T^3 + E T^4) / (F T - G T^2)
const ASAE_R: f64 = 22_105_649.25;
const ASAE_A: f64 = -27_405.526;
const ASAE_B: f64 = 97.5413;
const ASAE_C: f64 = -0.146244;
const ASAE_D: f64 = 0.12558e-3;
const ASAE_E: f64 = -0.48502e-7;
const ASAE_F: f64 = 4.34903;
const ASAE_G: f64 = 0.39381e-2;

// Molecular weight ratio of water vapor to dry air.
const RATIO_MW: f64 = 0.622;
const CP_AIR: f64 = 1.006; // kJ/(kg·K)
const CP_VAPOR: f64 = 1.86; // kJ/(kg·K)
const LATENT_HEAT: f64 = 2501.0; // kJ/kg at 0 °C

const DEW_POINT_TOLERANCE_K: f64 = 1e-10;
const DEW_POINT_MAX_ITERATIONS: usize = 100;
// Lower end of the dew point bracket. The saturation expression keeps
// increasing down to absolute zero, so every positive vapor pressure has a
// root above this.
const DEW_POINT_FLOOR_K: f64 = 1.0;

/// Ambient atmospheric pressure owned by a [`PsychrometricModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericState {
    pressure_kpa: f64,
}

impl AtmosphericState {
    pub fn new(pressure_kpa: f64) -> Result<Self, PsychroError> {
        check_pressure(pressure_kpa)?;
        Ok(Self { pressure_kpa })
    }

    /// Builds the state from a reading in hectopascals.
    pub fn from_hpa(pressure_hpa: f64) -> Result<Self, PsychroError> {
        Self::new(pressure_hpa / 10.0)
    }

    pub fn pressure_kpa(&self) -> f64 {
        self.pressure_kpa
    }
}

impl Default for AtmosphericState {
    fn default() -> Self {
        Self {
            pressure_kpa: STANDARD_PRESSURE_KPA,
        }
    }
}

/// Calculator holding the pressure used by [`PsychrometricModel::humidity_ratio`]
/// and [`PsychrometricModel::derive`].
///
/// The pressure is mutable state: an instance must not be shared between
/// workers without serializing `set_pressure` together with the derivation
/// that follows it. The pipeline gives each worker its own model.
#[derive(Debug, Clone, Default)]
pub struct PsychrometricModel {
    state: AtmosphericState,
}

impl PsychrometricModel {
    pub fn new(initial_pressure_kpa: f64) -> Result<Self, PsychroError> {
        Ok(Self {
            state: AtmosphericState::new(initial_pressure_kpa)?,
        })
    }

    /// Replaces the ambient pressure for every later call on this instance.
    /// The previous value is kept when the new one is rejected.
    pub fn set_pressure(&mut self, pressure_kpa: f64) -> Result<(), PsychroError> {
        self.state = AtmosphericState::new(pressure_kpa)?;
        Ok(())
    }

    pub fn pressure_kpa(&self) -> f64 {
        self.state.pressure_kpa()
    }

    pub fn saturation_vapor_pressure(&self, temperature_c: f64) -> Result<f64, PsychroError> {
        saturation_vapor_pressure(temperature_c)
    }

    pub fn partial_vapor_pressure(
        &self,
        temperature_c: f64,
        relative_humidity_pct: f64,
    ) -> Result<f64, PsychroError> {
        partial_vapor_pressure(temperature_c, relative_humidity_pct)
    }

    pub fn vapor_pressure_deficit(
        &self,
        temperature_c: f64,
        relative_humidity_pct: f64,
    ) -> Result<f64, PsychroError> {
        vapor_pressure_deficit(temperature_c, relative_humidity_pct)
    }

    pub fn humidity_ratio(&self, partial_vapor_pressure_kpa: f64) -> Result<f64, PsychroError> {
        humidity_ratio(partial_vapor_pressure_kpa, self.state.pressure_kpa())
    }

    pub fn enthalpy(&self, temperature_c: f64, humidity_ratio: f64) -> f64 {
        enthalpy(temperature_c, humidity_ratio)
    }

    pub fn dew_point(&self, partial_vapor_pressure_kpa: f64) -> Result<f64, PsychroError> {
        dew_point(partial_vapor_pressure_kpa)
    }

    /// Runs the whole chain at the model's current pressure.
    pub fn derive(&self, observation: &Observation) -> Result<DerivedQuantities, PsychroError> {
        derive(observation, self.state.pressure_kpa())
    }
}

/// Saturation vapor pressure over liquid water (kPa).
///
/// Below 0 °C the same expression gives the pressure over supercooled water,
/// which is the reference meteorological relative humidity uses.
/// Temperatures outside [`MIN_TEMPERATURE_C`]..=[`MAX_TEMPERATURE_C`] are rejected.
pub fn saturation_vapor_pressure(temperature_c: f64) -> Result<f64, PsychroError> {
    check_temperature(temperature_c)?;
    let t_k = temperature_c + KELVIN_OFFSET;
    Ok(ASAE_R * asae_ln_ratio(t_k).exp() / 1000.0)
}

/// Partial vapor pressure (kPa) for a temperature and relative humidity.
///
/// Relative humidity outside 0..=100 is clamped into range.
pub fn partial_vapor_pressure(
    temperature_c: f64,
    relative_humidity_pct: f64,
) -> Result<f64, PsychroError> {
    let rh = clamp_relative_humidity(relative_humidity_pct)?;
    Ok(saturation_vapor_pressure(temperature_c)? * rh / 100.0)
}

/// Vapor pressure deficit (kPa), never negative.
pub fn vapor_pressure_deficit(
    temperature_c: f64,
    relative_humidity_pct: f64,
) -> Result<f64, PsychroError> {
    let saturation = saturation_vapor_pressure(temperature_c)?;
    let partial = saturation * clamp_relative_humidity(relative_humidity_pct)? / 100.0;
    Ok((saturation - partial).max(0.0))
}

/// Humidity ratio (kg water / kg dry air) at the given ambient pressure.
///
/// Returns [`PsychroError::PhysicallyInconsistentState`] when the ambient
/// pressure does not exceed the vapor pressure.
pub fn humidity_ratio(
    partial_vapor_pressure_kpa: f64,
    pressure_kpa: f64,
) -> Result<f64, PsychroError> {
    if !partial_vapor_pressure_kpa.is_finite() || partial_vapor_pressure_kpa < 0.0 {
        return Err(PsychroError::invalid(
            "partial vapor pressure",
            partial_vapor_pressure_kpa,
            "must be finite and non-negative",
        ));
    }
    check_pressure(pressure_kpa)?;
    if pressure_kpa <= partial_vapor_pressure_kpa {
        return Err(PsychroError::PhysicallyInconsistentState {
            pressure_kpa,
            vapor_pressure_kpa: partial_vapor_pressure_kpa,
        });
    }
    Ok(RATIO_MW * partial_vapor_pressure_kpa / (pressure_kpa - partial_vapor_pressure_kpa))
}

/// Specific enthalpy of moist air (kJ/kg dry air).
pub fn enthalpy(temperature_c: f64, humidity_ratio: f64) -> f64 {
    CP_AIR * temperature_c + humidity_ratio * (LATENT_HEAT + CP_VAPOR * temperature_c)
}

/// Dew point (°C) for a partial vapor pressure in kPa.
///
/// Starts from the ASAE logarithmic approximation and refines it with
/// bracketed Newton steps on the saturation expression, so the result inverts
/// [`saturation_vapor_pressure`] to within 1e-6 °C.
///
/// Dry air can have a dew point well below [`MIN_TEMPERATURE_C`]; the
/// inversion follows the same expression down there. Only non-positive vapor
/// pressures and ones above the saturation pressure at [`MAX_TEMPERATURE_C`]
/// are rejected.
pub fn dew_point(partial_vapor_pressure_kpa: f64) -> Result<f64, PsychroError> {
    if !partial_vapor_pressure_kpa.is_finite() || partial_vapor_pressure_kpa <= 0.0 {
        return Err(PsychroError::invalid(
            "partial vapor pressure",
            partial_vapor_pressure_kpa,
            "must be finite and positive to have a dew point",
        ));
    }
    if partial_vapor_pressure_kpa > saturation_vapor_pressure(MAX_TEMPERATURE_C)? {
        return Err(PsychroError::invalid(
            "partial vapor pressure",
            partial_vapor_pressure_kpa,
            "above the saturation pressure at the highest supported temperature",
        ));
    }

    let vapor_pa = partial_vapor_pressure_kpa * 1000.0;
    // ln(Pv) - ln(R) rather than ln(Pv / R): the quotient underflows for tiny Pv.
    let target = vapor_pa.ln() - ASAE_R.ln();

    let mut lo = DEW_POINT_FLOOR_K;
    let mut hi = MAX_TEMPERATURE_C + KELVIN_OFFSET;
    let mut t_k = (asae_dew_point_estimate(vapor_pa) + KELVIN_OFFSET).clamp(lo, hi);

    for _ in 0..DEW_POINT_MAX_ITERATIONS {
        let residual = asae_ln_ratio(t_k) - target;
        if residual > 0.0 {
            hi = t_k;
        } else {
            lo = t_k;
        }

        let mut next = t_k - residual / asae_ln_ratio_slope(t_k);
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        if (next - t_k).abs() < DEW_POINT_TOLERANCE_K {
            return Ok(next - KELVIN_OFFSET);
        }
        t_k = next;
    }

    Ok(t_k - KELVIN_OFFSET)
}

/// Full derivation for one observation at an explicit ambient pressure.
///
/// A finite measured dew point is reported instead of the computed one.
pub fn derive(
    observation: &Observation,
    pressure_kpa: f64,
) -> Result<DerivedQuantities, PsychroError> {
    let saturation = saturation_vapor_pressure(observation.temperature_c)?;
    let rh = clamp_relative_humidity(observation.relative_humidity_pct)?;
    let partial = saturation * rh / 100.0;
    let deficit = (saturation - partial).max(0.0);
    let ratio = humidity_ratio(partial, pressure_kpa)?;

    let (dew_point_c, dew_point_source) = match observation
        .measured_dew_point_c
        .filter(|value| value.is_finite())
    {
        Some(measured) => (measured, DewPointSource::Measured),
        None => (dew_point(partial)?, DewPointSource::Computed),
    };

    Ok(DerivedQuantities {
        partial_vapor_pressure_kpa: partial,
        saturation_vapor_pressure_kpa: saturation,
        vapor_pressure_deficit_kpa: deficit,
        humidity_ratio_kg_per_kg: ratio,
        enthalpy_kj_per_kg: enthalpy(observation.temperature_c, ratio),
        dew_point_c,
        dew_point_source,
    })
}

fn check_temperature(temperature_c: f64) -> Result<(), PsychroError> {
    if !temperature_c.is_finite() {
        return Err(PsychroError::invalid("temperature", temperature_c, "must be finite"));
    }
    if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temperature_c) {
        return Err(PsychroError::invalid(
            "temperature",
            temperature_c,
            "outside -40..=260 °C",
        ));
    }
    Ok(())
}

fn check_pressure(pressure_kpa: f64) -> Result<(), PsychroError> {
    if !pressure_kpa.is_finite() || pressure_kpa <= 0.0 {
        return Err(PsychroError::invalid(
            "ambient pressure",
            pressure_kpa,
            "must be finite and positive",
        ));
    }
    Ok(())
}

fn clamp_relative_humidity(relative_humidity_pct: f64) -> Result<f64, PsychroError> {
    if !relative_humidity_pct.is_finite() {
        return Err(PsychroError::invalid(
            "relative humidity",
            relative_humidity_pct,
            "must be finite",
        ));
    }
    let clamped = relative_humidity_pct.clamp(0.0, 100.0);
    if clamped != relative_humidity_pct {
        debug!(
            "Relative humidity {} clamped to {}",
            relative_humidity_pct, clamped
        );
    }
    Ok(clamped)
}

fn asae_ln_ratio(t_k: f64) -> f64 {
    let numerator = ASAE_A + t_k * (ASAE_B + t_k * (ASAE_C + t_k * (ASAE_D + t_k * ASAE_E)));
    let denominator = ASAE_F * t_k - ASAE_G * t_k * t_k;
    numerator / denominator
}

// d/dT of asae_ln_ratio
fn asae_ln_ratio_slope(t_k: f64) -> f64 {
    let numerator = ASAE_A + t_k * (ASAE_B + t_k * (ASAE_C + t_k * (ASAE_D + t_k * ASAE_E)));
    let d_numerator =
        ASAE_B + t_k * (2.0 * ASAE_C + t_k * (3.0 * ASAE_D + t_k * 4.0 * ASAE_E));
    let denominator = ASAE_F * t_k - ASAE_G * t_k * t_k;
    let d_denominator = ASAE_F - 2.0 * ASAE_G * t_k;
    (d_numerator * denominator - numerator * d_denominator) / (denominator * denominator)
}

// ASAE dew point approximation, Pv in Pa, result in °C.
fn asae_dew_point_estimate(vapor_pa: f64) -> f64 {
    let ln_pv = vapor_pa.ln();
    -35.957 - 1.8726 * ln_pv + 1.1689 * ln_pv * ln_pv
}
