//! Simple Moving Average and related forecasting models.
//!
//! This module provides:
//! - `SimpleMovingAverage`: Forecasts using the mean of the last `window` observations
//! - `HistoricAverage`: Forecasts using the mean of ALL historical values
//! - `WindowAverage`: Forecasts using the mean of the last N observations, point only

use crate::core::ModelOutput;
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Capabilities, Forecaster};
use crate::utils::stats::{mean, normal_intervals, residual_sigma};
use ndarray::ArrayView2;

/// Simple Moving Average forecaster.
///
/// Predicts future values as the mean of the last `window` observations.
/// If window is 0, uses the mean of all historical data.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    window: usize, // 0 means use all data
    last_mean: Option<f64>,
    fitted: Option<Vec<f64>>,
    sigma: Option<f64>,
}

impl SimpleMovingAverage {
    /// Create a new SMA with the given window size.
    /// Window of 0 means use the entire history.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            last_mean: None,
            fitted: None,
            sigma: None,
        }
    }

    /// Get the window size.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Moving average of the observations before `end`.
    fn calculate_ma(&self, values: &[f64], end: usize) -> f64 {
        let actual_window = if self.window == 0 || self.window > end {
            end
        } else {
            self.window
        };
        mean(&values[end - actual_window..end])
    }
}

impl Default for SimpleMovingAverage {
    fn default() -> Self {
        Self::new(0) // Full history mean
    }
}

impl Forecaster for SimpleMovingAverage {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(SimpleMovingAverage::new(self.window))
    }

    fn fit(&mut self, y: &[f64], _exog: Option<ArrayView2<'_, f64>>) -> Result<()> {
        if y.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if self.window > 0 && y.len() < self.window {
            return Err(ForecastError::InsufficientData {
                needed: self.window,
                got: y.len(),
            });
        }

        let n = y.len();
        let actual_window = if self.window == 0 { n } else { self.window };
        self.last_mean = Some(mean(&y[n - actual_window..]));

        // fitted[0] is undefined, mean() of an empty window is NaN
        let fitted: Vec<f64> = (0..n).map(|i| self.calculate_ma(y, i)).collect();
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();

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
        let mean = self.last_mean.ok_or(ForecastError::FitRequired)?;
        let sigma = self.sigma.ok_or(ForecastError::FitRequired)?;

        // SMA predicts the same value for all horizons
        let point = vec![mean; horizon];
        if levels.is_empty() {
            return Ok(ModelOutput::from_values(point));
        }
        let intervals = normal_intervals(&point, &vec![sigma; horizon], levels)?;
        Ok(ModelOutput::from_values(point).with_intervals(intervals))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn name(&self) -> &str {
        "SimpleMovingAverage"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INTERVALS
    }
}

// ============================================================================
// HistoricAverage - Wrapper for full-history mean
// ============================================================================

/// HistoricAverage forecaster.
///
/// Predicts future values as the mean of ALL historical observations.
/// This is equivalent to `SimpleMovingAverage` with `window = 0`.
///
/// # Example
/// ```
/// use anofox_batch::models::baseline::HistoricAverage;
/// use anofox_batch::models::Forecaster;
///
/// let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
///
/// let mut model = HistoricAverage::new();
/// model.fit(&values, None).unwrap();
/// let output = model.predict(3, None, &[]).unwrap();
/// // All predictions will be 5.5 (mean of 1..10)
/// assert_eq!(output.mean(), &[5.5, 5.5, 5.5]);
/// ```
#[derive(Debug, Clone)]
pub struct HistoricAverage {
    inner: SimpleMovingAverage,
}

impl HistoricAverage {
    /// Create a new HistoricAverage forecaster.
    pub fn new() -> Self {
        Self {
            inner: SimpleMovingAverage::new(0),
        }
    }
}

impl Default for HistoricAverage {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for HistoricAverage {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(HistoricAverage::new())
    }

    fn fit(&mut self, y: &[f64], exog: Option<ArrayView2<'_, f64>>) -> Result<()> {
        self.inner.fit(y, exog)
    }

    fn predict(
        &self,
        horizon: usize,
        future_exog: Option<ArrayView2<'_, f64>>,
        levels: &[f64],
    ) -> Result<ModelOutput> {
        self.inner.predict(horizon, future_exog, levels)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.inner.fitted_values()
    }

    fn name(&self) -> &str {
        "HistoricAverage"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INTERVALS
    }
}

// ============================================================================
// WindowAverage - Wrapper for fixed-window mean
// ============================================================================

/// WindowAverage forecaster.
///
/// Predicts future values as the mean of the last `window_size` observations.
/// Produces point forecasts only; requested levels are ignored.
///
/// # Example
/// ```
/// use anofox_batch::models::baseline::WindowAverage;
/// use anofox_batch::models::Forecaster;
///
/// let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
///
/// let mut model = WindowAverage::new(3);  // Use last 3 values
/// model.fit(&values, None).unwrap();
/// let output = model.predict(3, None, &[]).unwrap();
/// // All predictions will be 9.0 (mean of 8, 9, 10)
/// assert_eq!(output.mean(), &[9.0, 9.0, 9.0]);
/// ```
#[derive(Debug, Clone)]
pub struct WindowAverage {
    inner: SimpleMovingAverage,
}

impl WindowAverage {
    /// Create a new WindowAverage forecaster with the specified window size.
    ///
    /// The window size must be at least 1. If 0 is passed, it will be set to 1.
    pub fn new(window_size: usize) -> Self {
        Self {
            inner: SimpleMovingAverage::new(window_size.max(1)),
        }
    }

    /// Get the window size.
    pub fn window_size(&self) -> usize {
        self.inner.window()
    }
}

impl Forecaster for WindowAverage {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(WindowAverage::new(self.window_size()))
    }

    fn fit(&mut self, y: &[f64], exog: Option<ArrayView2<'_, f64>>) -> Result<()> {
        self.inner.fit(y, exog)
    }

    fn predict(
        &self,
        horizon: usize,
        future_exog: Option<ArrayView2<'_, f64>>,
        _levels: &[f64],
    ) -> Result<ModelOutput> {
        self.inner.predict(horizon, future_exog, &[])
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.inner.fitted_values()
    }

    fn name(&self) -> &str {
        "WindowAverage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_requires_sufficient_history() {
        let mut model = SimpleMovingAverage::new(3);
        assert!(matches!(
            model.fit(&[1.0, 2.0], None),
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        ));

        // Unfitted model can't predict
        assert!(matches!(
            model.predict(5, None, &[]),
            Err(ForecastError::FitRequired)
        ));
    }

    #[test]
    fn sma_forecasts_repeating_averages() {
        let mut model = SimpleMovingAverage::new(3);
        model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();

        let output = model.predict(3, None, &[]).unwrap();

        // Mean of last 3 values: (3 + 4 + 5) / 3 = 4
        for pred in output.mean() {
            assert_relative_eq!(*pred, 4.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn sma_window_0_uses_full_history() {
        let mut model = SimpleMovingAverage::new(0);
        model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();

        let output = model.predict(1, None, &[]).unwrap();
        assert_relative_eq!(output.mean()[0], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn sma_window_0_on_empty_data() {
        let mut model = SimpleMovingAverage::new(0);
        assert!(matches!(model.fit(&[], None), Err(ForecastError::EmptyData)));
    }

    #[test]
    fn sma_confidence_intervals() {
        let values: Vec<f64> = (0..10)
            .map(|i| (i as f64) + 0.5 * (i as f64).sin())
            .collect();

        let mut model = SimpleMovingAverage::new(5);
        model.fit(&values, None).unwrap();

        let output = model.predict(3, None, &[95.0]).unwrap();
        let interval = output.interval(95.0).unwrap();

        for i in 0..3 {
            assert!(interval.lower[i] < output.mean()[i]);
            assert!(output.mean()[i] < interval.upper[i]);
        }
    }

    #[test]
    fn sma_fitted_values() {
        let mut model = SimpleMovingAverage::new(2);
        model.fit(&[1.0, 3.0, 5.0, 7.0, 9.0], None).unwrap();

        let fitted = model.fitted_values().unwrap();

        assert!(fitted[0].is_nan());
        // fitted[1] = mean(values[0..1]) = 1.0
        assert_relative_eq!(fitted[1], 1.0, epsilon = 1e-10);
        // fitted[2] = mean(values[0..2]) = (1+3)/2 = 2.0
        assert_relative_eq!(fitted[2], 2.0, epsilon = 1e-10);
        // fitted[4] = mean(values[2..4]) = (5+7)/2 = 6.0
        assert_relative_eq!(fitted[4], 6.0, epsilon = 1e-10);
    }

    #[test]
    fn historic_average_basic() {
        let mut model = HistoricAverage::new();
        model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();

        let output = model.predict(3, None, &[80.0]).unwrap();
        for pred in output.mean() {
            assert_relative_eq!(*pred, 3.0, epsilon = 1e-10);
        }
        assert!(output.interval(80.0).is_some());
        assert_eq!(model.name(), "HistoricAverage");
    }

    #[test]
    fn window_average_basic() {
        let mut model = WindowAverage::new(3);
        model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();

        let output = model.predict(3, None, &[]).unwrap();
        // Mean of last 3: (3+4+5)/3 = 4
        for pred in output.mean() {
            assert_relative_eq!(*pred, 4.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn window_average_is_point_only() {
        let mut model = WindowAverage::new(2);
        model.fit(&[1.0, 2.0, 3.0], None).unwrap();

        assert_eq!(model.capabilities(), Capabilities::POINT);
        let output = model.predict(2, None, &[95.0]).unwrap();
        assert!(!output.has_intervals());
    }

    #[test]
    fn window_average_minimum_size() {
        // Window of 0 should become 1
        let model = WindowAverage::new(0);
        assert_eq!(model.window_size(), 1);
        assert_eq!(WindowAverage::new(12).window_size(), 12);
    }
}
