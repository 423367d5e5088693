//! Seasonal Naive forecasting model.
//!
//! Forecasts by repeating the value from the same season in the previous cycle.

use crate::core::ModelOutput;
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Capabilities, Forecaster};
use crate::utils::stats::{normal_intervals, residual_sigma};
use ndarray::ArrayView2;

/// Seasonal Naive forecaster.
///
/// Each forecast is equal to the observation from the same season
/// in the previous year (or previous seasonal period).
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    period: usize,
    last_season: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    sigma: Option<f64>,
}

impl SeasonalNaive {
    /// Create a new SeasonalNaive model with the given seasonal period.
    ///
    /// A period of 0 is treated as 1.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            last_season: None,
            fitted: None,
            sigma: None,
        }
    }

    /// Get the seasonal period.
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for SeasonalNaive {
    fn default() -> Self {
        Self::new(12) // Default to monthly seasonality
    }
}

impl Forecaster for SeasonalNaive {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(SeasonalNaive::new(self.period))
    }

    fn fit(&mut self, y: &[f64], _exog: Option<ArrayView2<'_, f64>>) -> Result<()> {
        if y.len() < self.period {
            return Err(ForecastError::InsufficientData {
                needed: self.period,
                got: y.len(),
            });
        }

        // Fitted values: y_hat[t] = y[t - period]
        let fitted: Vec<f64> = (0..y.len())
            .map(|i| {
                if i < self.period {
                    f64::NAN
                } else {
                    y[i - self.period]
                }
            })
            .collect();
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();

        self.sigma = Some(residual_sigma(&residuals));
        self.last_season = Some(y[y.len() - self.period..].to_vec());
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(
        &self,
        horizon: usize,
        _future_exog: Option<ArrayView2<'_, f64>>,
        levels: &[f64],
    ) -> Result<ModelOutput> {
        let season = self.last_season.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = self.sigma.ok_or(ForecastError::FitRequired)?;

        let point: Vec<f64> = (0..horizon).map(|h| season[h % self.period]).collect();
        if levels.is_empty() {
            return Ok(ModelOutput::from_values(point));
        }

        // Standard error increases with number of complete seasons ahead
        let std_errors: Vec<f64> = (0..horizon)
            .map(|h| sigma * (((h / self.period) + 1) as f64).sqrt())
            .collect();
        let intervals = normal_intervals(&point, &std_errors, levels)?;
        Ok(ModelOutput::from_values(point).with_intervals(intervals))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn name(&self) -> &str {
        "SeasonalNaive"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INTERVALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasonal_naive_repeats_last_cycle() {
        let mut model = SeasonalNaive::new(3);
        model
            .fit(&[1.0, 2.0, 3.0, 10.0, 20.0, 30.0], None)
            .unwrap();

        let output = model.predict(7, None, &[]).unwrap();
        assert_eq!(
            output.mean(),
            &[10.0, 20.0, 30.0, 10.0, 20.0, 30.0, 10.0]
        );
    }

    #[test]
    fn seasonal_naive_fitted_values_lag_one_period() {
        let mut model = SeasonalNaive::new(2);
        model.fit(&[1.0, 2.0, 3.0, 4.0], None).unwrap();

        let fitted = model.fitted_values().unwrap();
        assert!(fitted[0].is_nan() && fitted[1].is_nan());
        assert_eq!(&fitted[2..], &[1.0, 2.0]);
    }

    #[test]
    fn seasonal_naive_intervals_step_up_each_cycle() {
        let mut model = SeasonalNaive::new(2);
        model.fit(&[1.0, 2.0, 2.0, 3.0, 3.5, 4.0], None).unwrap();

        let output = model.predict(4, None, &[90.0]).unwrap();
        let interval = output.interval(90.0).unwrap();
        let width = |i: usize| interval.upper[i] - interval.lower[i];

        assert!((width(0) - width(1)).abs() < 1e-12);
        assert!(width(2) > width(1));
    }

    #[test]
    fn seasonal_naive_needs_a_full_period() {
        let mut model = SeasonalNaive::new(12);
        assert_eq!(
            model.fit(&[1.0; 5], None),
            Err(ForecastError::InsufficientData { needed: 12, got: 5 })
        );
    }

    #[test]
    fn seasonal_naive_fresh_keeps_period() {
        let model = SeasonalNaive::new(7);
        let mut fresh = model.fresh();
        assert!(!fresh.is_fitted());
        assert_eq!(
            fresh.fit(&[1.0; 6], None),
            Err(ForecastError::InsufficientData { needed: 7, got: 6 })
        );
        assert_eq!(SeasonalNaive::default().period(), 12);
    }
}
