//! Rolling-origin cross-validation over every group of a buffer.
//!
//! Windows are anchored at the end of each group: the first cutoff sits
//! `test_size` rows before the end and later cutoffs advance by `step_size`
//! until the last one leaves exactly `horizon` rows.

use crate::core::GroupedBuffer;
use crate::engine::fit_predict::validate_models;
use crate::engine::layout::ColumnLayout;
use crate::engine::results::{CrossValidationOutput, CvFittedValues, ForecastMatrix};
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Operation};
use crate::utils::validate_levels;
use ndarray::{s, Array2, Array3, Array4};
use tracing::info;

/// How the evaluated tail of each series is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CVWindows {
    /// Number of trailing rows covered by all windows together.
    TestSize(usize),
    /// Number of windows; the test size follows from the horizon and step.
    Count(usize),
}

/// Configuration for rolling-origin cross-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVConfig {
    /// Forecast horizon for each window.
    pub horizon: usize,
    /// Size of the evaluated tail.
    pub windows: CVWindows,
    /// Rows between consecutive cutoffs.
    pub step_size: usize,
    /// Rolling training window length, `None` for an expanding window.
    pub input_size: Option<usize>,
}

impl CVConfig {
    /// Evaluate the last `test_size` rows of every group.
    pub fn new(horizon: usize, test_size: usize) -> Self {
        Self {
            horizon,
            windows: CVWindows::TestSize(test_size),
            step_size: 1,
            input_size: None,
        }
    }

    /// Evaluate `n_windows` windows per group.
    pub fn from_windows(horizon: usize, n_windows: usize) -> Self {
        Self {
            horizon,
            windows: CVWindows::Count(n_windows),
            step_size: 1,
            input_size: None,
        }
    }

    /// Set the step size between cutoffs.
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Train on at most the last `input_size` rows before each cutoff.
    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = Some(input_size);
        self
    }

    /// Number of trailing rows evaluated per group.
    pub fn test_size(&self) -> usize {
        match self.windows {
            CVWindows::TestSize(test_size) => test_size,
            CVWindows::Count(n) => self.horizon + self.step_size * n.saturating_sub(1),
        }
    }

    /// Number of windows per group.
    pub fn n_windows(&self) -> Result<usize> {
        self.validate()?;
        Ok((self.test_size() - self.horizon) / self.step_size + 1)
    }

    /// Cutoffs as row counts from the end of a group, earliest first.
    pub fn cutoffs(&self) -> Result<Vec<usize>> {
        let test_size = self.test_size();
        Ok((0..self.n_windows()?)
            .map(|w| test_size - w * self.step_size)
            .collect())
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        if self.step_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "step_size must be positive".to_string(),
            ));
        }
        if self.windows == CVWindows::Count(0) {
            return Err(ForecastError::InvalidParameter(
                "n_windows must be positive".to_string(),
            ));
        }
        if self.input_size == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "input_size must be positive".to_string(),
            ));
        }
        let test_size = self.test_size();
        if test_size < self.horizon {
            return Err(ForecastError::InvalidParameter(format!(
                "test_size ({}) must be at least the horizon ({})",
                test_size, self.horizon
            )));
        }
        if (test_size - self.horizon) % self.step_size != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "test_size - horizon ({}) must be a multiple of step_size ({})",
                test_size - self.horizon,
                self.step_size
            )));
        }
        Ok(())
    }
}

/// Backtest every model on every group.
///
/// For each group and window the models are fitted on the rows before the
/// cutoff and forecast the next `horizon` rows, using the exogenous columns of
/// those rows as future values. The result has one row per group, window and
/// step with the held-out target in column `"y"`.
pub fn cross_validation(
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    config: &CVConfig,
    levels: &[f64],
    want_fitted: bool,
    verbose: bool,
) -> Result<CrossValidationOutput> {
    if buffer.is_empty() || buffer.n_columns() == 0 {
        return Err(ForecastError::EmptyData);
    }
    validate_models(models)?;
    config.validate()?;
    validate_levels(levels)?;

    let h = config.horizon;
    let test_size = config.test_size();
    let cutoffs = config.cutoffs()?;
    let n_windows = cutoffs.len();
    let n_groups = buffer.len();
    for i in 0..n_groups {
        if buffer.group_len(i) < test_size {
            return Err(ForecastError::InsufficientData {
                needed: test_size,
                got: buffer.group_len(i),
            });
        }
    }

    let layout = ColumnLayout::plan(models.iter().map(|m| m.as_ref()), Operation::Forecast, levels);
    let width = 1 + layout.total_columns();
    let mut out = Array4::from_elem((n_groups, n_windows, h, width), f64::NAN);
    let mut fitted = want_fitted.then(|| {
        (
            Array3::from_elem((buffer.n_rows(), n_windows, 1 + models.len()), f64::NAN),
            Array2::from_elem((buffer.n_rows(), n_windows), false),
            Array2::from_elem((buffer.n_rows(), n_windows), false),
        )
    });

    for i in 0..n_groups {
        let rows = buffer.group_range(i);
        let n = rows.len();
        let y = buffer.target(i).to_vec();
        let exog = buffer.exog(i);

        for (w, &cutoff) in cutoffs.iter().enumerate() {
            let cut = n - cutoff;
            let start = config.input_size.map_or(0, |size| cut.saturating_sub(size));
            let train = &y[start..cut];
            let train_exog = exog.map(|x| x.slice_move(s![start..cut, ..]));
            let future = exog.map(|x| x.slice_move(s![cut..cut + h, ..]));

            for t in 0..h {
                out[[i, w, t, 0]] = y[cut + t];
            }

            for (m, model) in models.iter().enumerate() {
                let output = model
                    .forecast(h, train, train_exog, future, want_fitted, layout.levels_for(m))
                    .map_err(|e| ForecastError::model_failed(model.name(), i, &e))?;
                let span = layout.span(m);
                layout.write_block(
                    m,
                    &output,
                    out.slice_mut(s![i, w, .., span.start + 1..span.end + 1]),
                )?;

                if let Some((values, _, _)) = fitted.as_mut() {
                    let in_sample = output.fitted().ok_or_else(|| {
                        ForecastError::model_failed(model.name(), i, &ForecastError::FitRequired)
                    })?;
                    if in_sample.len() != train.len() {
                        return Err(ForecastError::DimensionMismatch {
                            expected: train.len(),
                            got: in_sample.len(),
                        });
                    }
                    for (k, &v) in in_sample.mean.iter().enumerate() {
                        values[[rows.start + start + k, w, 1 + m]] = v;
                    }
                }
            }

            if let Some((values, in_window, last_train)) = fitted.as_mut() {
                for (k, &v) in train.iter().enumerate() {
                    values[[rows.start + start + k, w, 0]] = v;
                    in_window[[rows.start + start + k, w]] = true;
                }
                if cut > start {
                    last_train[[rows.start + cut - 1, w]] = true;
                }
            }
        }

        if verbose {
            info!(group = i + 1, n_groups, "cross-validation progress");
        }
    }

    let mut columns = Vec::with_capacity(width);
    columns.push("y".to_string());
    columns.extend(layout.columns());
    let values = out
        .into_shape_with_order((n_groups * n_windows * h, width))
        .map_err(|e| ForecastError::ComputationError(e.to_string()))?;

    let fitted = fitted.map(|(values, in_window, last_train)| {
        let mut columns = Vec::with_capacity(1 + models.len());
        columns.push("y".to_string());
        columns.extend(models.iter().map(|m| m.name().to_string()));
        CvFittedValues {
            values,
            in_window,
            last_train,
            columns,
        }
    });

    Ok(CrossValidationOutput {
        forecasts: ForecastMatrix::new(values, columns)?,
        n_windows,
        fitted,
    })
}
