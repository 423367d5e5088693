//! Statistical utility functions.

use crate::core::Interval;
use crate::error::{ForecastError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Check that every level is a percentage strictly between 0 and 100.
pub fn validate_levels(levels: &[f64]) -> Result<()> {
    match levels.iter().find(|&&l| !(l > 0.0 && l < 100.0)) {
        Some(bad) => Err(ForecastError::InvalidParameter(format!(
            "level must be in (0, 100), got {}",
            bad
        ))),
        None => Ok(()),
    }
}

/// Two-sided standard normal quantile for a confidence level in percent.
///
/// # Example
/// ```
/// use anofox_batch::utils::z_score;
///
/// // 95% confidence level -> z ≈ 1.96
/// let z = z_score(95.0).unwrap();
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn z_score(level: f64) -> Result<f64> {
    validate_levels(&[level])?;
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ForecastError::ComputationError(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + level / 200.0))
}

/// Root mean square of the non-NaN residuals, NaN when there are none.
pub fn residual_sigma(residuals: &[f64]) -> f64 {
    let valid: Vec<f64> = residuals.iter().copied().filter(|r| !r.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    (valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64).sqrt()
}

/// Gaussian bounds `point ± z * se` for every requested level.
pub fn normal_intervals(point: &[f64], std_errors: &[f64], levels: &[f64]) -> Result<Vec<Interval>> {
    if point.len() != std_errors.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: point.len(),
            got: std_errors.len(),
        });
    }
    levels
        .iter()
        .map(|&level| {
            let z = z_score(level)?;
            let lower = point.iter().zip(std_errors).map(|(p, se)| p - z * se).collect();
            let upper = point.iter().zip(std_errors).map(|(p, se)| p + z * se).collect();
            Ok(Interval::new(level, lower, upper))
        })
        .collect()
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
