//! Diffusion fit and Stokes–Einstein estimators.
//!
//! Motion is modelled in two dimensions, so `MSD(t) = 4 D t`. The diffusion
//! coefficient is the slope of a least-squares line through the origin over
//! the first `fit_lags` lags present in the MSD series, divided by four.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::analysis::msd::MsdSeries;
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisConfig, EstimationError};

/// Boltzmann constant in J/K.
pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-23;
/// Ideal gas constant in J/(mol·K).
pub const IDEAL_GAS_CONSTANT: f64 = 8.31446261815324;
const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;
const SPATIAL_DIMENSIONS: f64 = 2.0;
const SQUARE_MICROMETER_IN_SQUARE_METERS: f64 = 1e-12;
const MIN_FIT_POINTS: usize = 2;

pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + ZERO_CELSIUS_IN_KELVIN
}

/// Diffusion coefficient recovered from the early MSD lags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DiffusionFit {
    pub coefficient_um2_per_s: f64,
    pub coefficient_m2_per_s: f64,
    pub lags_used: usize,
    pub r_squared: f64,
}

/// Physical quantities derived from one analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhysicalEstimate {
    pub diffusion: DiffusionFit,
    /// Hydrodynamic radius in meters.
    pub radius_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avogadro_estimate: Option<f64>,
}

pub fn fit_diffusion(msd: &MsdSeries, fit_lags: usize) -> Result<DiffusionFit, EstimationError> {
    let window: Vec<_> = msd
        .iter()
        .filter(|point| point.samples > 0)
        .take(fit_lags)
        .collect();
    if window.len() < MIN_FIT_POINTS {
        return Err(EstimationError::InsufficientData {
            usable: window.len(),
            required: MIN_FIT_POINTS,
        });
    }

    let times: Vec<f64> = window.iter().map(|point| point.lag_seconds).collect();
    let values: Vec<f64> = window.iter().map(|point| point.msd_um2).collect();
    let fit = StatsHelper::fit_through_origin(&times, &values).ok_or(
        EstimationError::InsufficientData {
            usable: 0,
            required: MIN_FIT_POINTS,
        },
    )?;

    let coefficient = fit.slope / (2.0 * SPATIAL_DIMENSIONS);
    if !coefficient.is_finite() || coefficient <= 0.0 {
        return Err(EstimationError::NonPositiveDiffusion(coefficient));
    }

    Ok(DiffusionFit {
        coefficient_um2_per_s: coefficient,
        coefficient_m2_per_s: coefficient * SQUARE_MICROMETER_IN_SQUARE_METERS,
        lags_used: window.len(),
        r_squared: fit.r_squared,
    })
}

fn check_conditions(temperature_celsius: f64, viscosity_pa_s: f64) -> Result<f64, EstimationError> {
    let kelvin = celsius_to_kelvin(temperature_celsius);
    if !kelvin.is_finite() || kelvin <= 0.0 {
        return Err(EstimationError::InvalidConditions(format!(
            "absolute temperature {} K",
            kelvin
        )));
    }
    if !viscosity_pa_s.is_finite() || viscosity_pa_s <= 0.0 {
        return Err(EstimationError::InvalidConditions(format!(
            "viscosity {} Pa·s",
            viscosity_pa_s
        )));
    }
    Ok(kelvin)
}

/// Stokes–Einstein: `r = k_B T / (6 π η D)`, with `η` in Pa·s and `D` in m²/s.
pub fn stokes_einstein_radius(
    diffusion_m2_per_s: f64,
    temperature_celsius: f64,
    viscosity_pa_s: f64,
) -> Result<f64, EstimationError> {
    if !diffusion_m2_per_s.is_finite() || diffusion_m2_per_s <= 0.0 {
        return Err(EstimationError::NonPositiveDiffusion(diffusion_m2_per_s));
    }
    let kelvin = check_conditions(temperature_celsius, viscosity_pa_s)?;
    let radius =
        BOLTZMANN_CONSTANT * kelvin / (6.0 * PI * viscosity_pa_s * diffusion_m2_per_s);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(EstimationError::InvalidRadius(radius));
    }
    Ok(radius)
}

/// Fits `D` from `msd` and converts it into a particle radius in meters.
pub fn estimate_radius(
    msd: &MsdSeries,
    temperature_celsius: f64,
    viscosity_pa_s: f64,
    fit_lags: usize,
) -> Result<f64, EstimationError> {
    let fit = fit_diffusion(msd, fit_lags)?;
    stokes_einstein_radius(fit.coefficient_m2_per_s, temperature_celsius, viscosity_pa_s)
}

/// Solves Stokes–Einstein for `N_A = R / k_B`: `N_A = R T / (6 π η r D)`.
pub fn estimate_avogadro(
    radius_m: f64,
    temperature_celsius: f64,
    viscosity_pa_s: f64,
    diffusion_m2_per_s: f64,
) -> Result<f64, EstimationError> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(EstimationError::InvalidRadius(radius_m));
    }
    if !diffusion_m2_per_s.is_finite() || diffusion_m2_per_s <= 0.0 {
        return Err(EstimationError::NonPositiveDiffusion(diffusion_m2_per_s));
    }
    let kelvin = check_conditions(temperature_celsius, viscosity_pa_s)?;
    Ok(IDEAL_GAS_CONSTANT * kelvin / (6.0 * PI * viscosity_pa_s * radius_m * diffusion_m2_per_s))
}

/// Runs the diffusion fit, radius and Avogadro estimators with run-scoped settings.
///
/// The Avogadro estimate uses `known_radius_m` when configured, otherwise the
/// radius estimated from the same data.
pub fn estimate(msd: &MsdSeries, config: &AnalysisConfig) -> Result<PhysicalEstimate, EstimationError> {
    let diffusion = fit_diffusion(msd, config.fit_lags)?;
    let viscosity = config.viscosity_pa_s();
    let radius_m = stokes_einstein_radius(
        diffusion.coefficient_m2_per_s,
        config.temperature_celsius,
        viscosity,
    )?;

    let avogadro_estimate = if config.estimate_avogadro {
        Some(estimate_avogadro(
            config.known_radius_m.unwrap_or(radius_m),
            config.temperature_celsius,
            viscosity,
            diffusion.coefficient_m2_per_s,
        )?)
    } else {
        None
    };

    Ok(PhysicalEstimate {
        diffusion,
        radius_m,
        avogadro_estimate,
    })
}
