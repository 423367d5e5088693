//! Naive forecasting model.
//!
//! The naive method simply forecasts the last observed value for all future periods.

use crate::core::ModelOutput;
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Capabilities, Forecaster};
use crate::utils::stats::{normal_intervals, residual_sigma};
use ndarray::ArrayView2;

/// Naive forecaster that repeats the last value.
#[derive(Debug, Clone, Default)]
pub struct Naive {
    last_value: Option<f64>,
    fitted: Option<Vec<f64>>,
    sigma: Option<f64>,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(Naive::new())
    }

    fn fit(&mut self, y: &[f64], _exog: Option<ArrayView2<'_, f64>>) -> Result<()> {
        let last = *y.last().ok_or(ForecastError::EmptyData)?;

        // Fitted values are shifted history (y_hat[t] = y[t-1])
        let mut fitted = Vec::with_capacity(y.len());
        fitted.push(f64::NAN);
        fitted.extend_from_slice(&y[..y.len() - 1]);

        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();

        self.last_value = Some(last);
        self.sigma = Some(residual_sigma(&residuals));
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(
        &self,
        horizon: usize,
        _future_exog: Option<ArrayView2<'_, f64>>,
        levels: &[f64],
    ) -> Result<ModelOutput> {
        let last = self.last_value.ok_or(ForecastError::FitRequired)?;
        let sigma = self.sigma.ok_or(ForecastError::FitRequired)?;

        let point = vec![last; horizon];
        if levels.is_empty() {
            return Ok(ModelOutput::from_values(point));
        }

        // Random-walk errors accumulate, so the interval widens with sqrt(h)
        let std_errors: Vec<f64> = (1..=horizon).map(|h| sigma * (h as f64).sqrt()).collect();
        let intervals = normal_intervals(&point, &std_errors, levels)?;
        Ok(ModelOutput::from_values(point).with_intervals(intervals))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn name(&self) -> &str {
        "Naive"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INTERVALS
    }
}
