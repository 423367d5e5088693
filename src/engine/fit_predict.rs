//! Fit, predict and one-shot forecast over every group of a buffer.
//!
//! Each function runs sequentially over the groups it is given. Parallel
//! execution splits the input and calls these per chunk, see
//! [`crate::parallel`].

use crate::core::GroupedBuffer;
use crate::engine::fitted::{FittedModels, FittedView};
use crate::engine::layout::ColumnLayout;
use crate::engine::results::{FittedValues, ForecastMatrix, ForecastOutput};
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Forecaster, Operation};
use crate::utils::validate_levels;
use ndarray::{s, Array2};
use std::collections::HashSet;
use tracing::{info, warn};

/// Check that at least one model is given and that names are unique.
pub fn validate_models(models: &[BoxedForecaster]) -> Result<()> {
    if models.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "at least one model is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(models.len());
    for model in models {
        if !seen.insert(model.name()) {
            return Err(ForecastError::InvalidParameter(format!(
                "duplicate model name '{}', wrap one of them in Aliased",
                model.name()
            )));
        }
    }
    Ok(())
}

pub fn validate_horizon(h: usize) -> Result<()> {
    if h == 0 {
        return Err(ForecastError::InvalidParameter(
            "horizon must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Check future exogenous values against `n_groups` groups with
/// `n_features` exogenous columns.
///
/// Every group must hold exactly `h` rows. Missing future values are only
/// accepted when the models were trained without exogenous columns.
pub fn validate_future_exog(
    n_groups: usize,
    n_features: usize,
    h: usize,
    future_exog: Option<&GroupedBuffer>,
) -> Result<()> {
    let future = match future_exog {
        Some(future) => future,
        None if n_features == 0 => return Ok(()),
        None => {
            return Err(ForecastError::InvalidParameter(format!(
                "training data has {} exogenous columns but no future values were given",
                n_features
            )))
        }
    };

    if future.len() != n_groups {
        return Err(ForecastError::DimensionMismatch {
            expected: n_groups,
            got: future.len(),
        });
    }
    for i in 0..future.len() {
        let got = (future.group_len(i), future.n_columns());
        if got != (h, n_features) {
            return Err(ForecastError::ShapeMismatch {
                expected: (h, n_features),
                got,
            });
        }
    }
    Ok(())
}

fn validate_buffer(buffer: &GroupedBuffer) -> Result<()> {
    if buffer.is_empty() || buffer.n_columns() == 0 {
        return Err(ForecastError::EmptyData);
    }
    Ok(())
}

/// Run every configuration check of a fit/predict/forecast call.
pub fn validate_request(
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
) -> Result<()> {
    validate_buffer(buffer)?;
    validate_models(models)?;
    validate_horizon(h)?;
    validate_levels(levels)?;
    validate_future_exog(buffer.len(), buffer.n_features(), h, future_exog)
}

/// Fit a fresh copy of every model on every group.
///
/// The first failure aborts the whole fit.
pub fn fit(buffer: &GroupedBuffer, models: &[BoxedForecaster]) -> Result<FittedModels> {
    validate_buffer(buffer)?;
    validate_models(models)?;

    let mut fitted = Vec::with_capacity(buffer.len() * models.len());
    for i in 0..buffer.len() {
        let y = buffer.target(i).to_vec();
        let exog = buffer.exog(i);
        for model in models {
            let mut instance = model.fresh();
            instance
                .fit(&y, exog)
                .map_err(|e| ForecastError::model_failed(model.name(), i, &e))?;
            fitted.push(instance);
        }
    }
    FittedModels::new(fitted, buffer.len(), models.len(), buffer.n_features())
}

/// Predict `h` steps for every fitted model.
///
/// Rows `[i * h, (i + 1) * h)` of the result belong to group `i`.
pub fn predict(
    fitted: FittedView<'_>,
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
) -> Result<ForecastMatrix> {
    if fitted.n_groups() == 0 {
        return Err(ForecastError::EmptyData);
    }
    validate_horizon(h)?;
    validate_levels(levels)?;
    validate_future_exog(fitted.n_groups(), fitted.n_features(), h, future_exog)?;

    let layout = ColumnLayout::plan(
        fitted.row(0).iter().map(|m| m.as_ref()),
        Operation::Predict,
        levels,
    );
    let mut values = Array2::from_elem((fitted.n_groups() * h, layout.total_columns()), f64::NAN);

    for i in 0..fitted.n_groups() {
        let future = future_exog.map(|x| x.group(i));
        for (m, model) in fitted.row(i).iter().enumerate() {
            let output = model
                .predict(h, future, layout.levels_for(m))
                .map_err(|e| ForecastError::model_failed(model.name(), i, &e))?;
            layout.write_block(
                m,
                &output,
                values.slice_mut(s![i * h..(i + 1) * h, layout.span(m)]),
            )?;
        }
    }
    ForecastMatrix::new(values, layout.columns())
}

/// Fit every model on every group, then predict `h` steps.
pub fn fit_predict(
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
) -> Result<(FittedModels, ForecastMatrix)> {
    validate_request(buffer, models, h, future_exog, levels)?;
    let fitted = fit(buffer, models)?;
    let forecasts = predict(fitted.view(), h, future_exog, levels)?;
    Ok((fitted, forecasts))
}

/// Stateless fit and forecast of every model on every group.
///
/// A model that fails on a group is retried once with `fallback`, whose output
/// is reported under the failing model's columns. With `want_fitted` the
/// in-sample values are collected into a matrix aligned with the input rows.
pub fn forecast(
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    fallback: Option<&dyn Forecaster>,
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
    want_fitted: bool,
    verbose: bool,
) -> Result<ForecastOutput> {
    validate_request(buffer, models, h, future_exog, levels)?;

    let layout = ColumnLayout::plan(models.iter().map(|m| m.as_ref()), Operation::Forecast, levels);
    let n_groups = buffer.len();
    let mut forecasts = Array2::from_elem((n_groups * h, layout.total_columns()), f64::NAN);
    let mut fitted = want_fitted.then(|| {
        let mut values = Array2::from_elem((buffer.n_rows(), 1 + layout.total_columns()), f64::NAN);
        values.column_mut(0).assign(&buffer.data().column(0));
        values
    });

    for i in 0..n_groups {
        let y = buffer.target(i).to_vec();
        let exog = buffer.exog(i);
        let future = future_exog.map(|x| x.group(i));

        for (m, model) in models.iter().enumerate() {
            let levels_m = layout.levels_for(m);
            let (output, with_bounds) =
                match model.forecast(h, &y, exog, future, want_fitted, levels_m) {
                    Ok(output) => (output, true),
                    Err(e) => {
                        let fallback = fallback
                            .ok_or_else(|| ForecastError::model_failed(model.name(), i, &e))?;
                        warn!(
                            model = model.name(),
                            fallback = fallback.name(),
                            group = i,
                            error = %e,
                            "model failed, using fallback"
                        );
                        // A point-only fallback leaves the primary's bound columns NaN.
                        let with_bounds =
                            fallback.capabilities().supports_levels(Operation::Forecast);
                        let fallback_levels: &[f64] = if with_bounds { levels_m } else { &[] };
                        let output = fallback
                            .forecast(h, &y, exog, future, want_fitted, fallback_levels)
                            .map_err(|e| ForecastError::model_failed(fallback.name(), i, &e))?;
                        (output, with_bounds)
                    }
                };

            let dest = forecasts.slice_mut(s![i * h..(i + 1) * h, layout.span(m)]);
            if with_bounds {
                layout.write_block(m, &output, dest)?;
            } else {
                layout.write_point(&output, dest)?;
            }

            if let Some(fitted) = fitted.as_mut() {
                let in_sample = output.fitted().ok_or_else(|| {
                    ForecastError::model_failed(model.name(), i, &ForecastError::FitRequired)
                })?;
                let span = layout.span(m);
                layout.write_in_sample(
                    m,
                    in_sample,
                    fitted.slice_mut(s![buffer.group_range(i), span.start + 1..span.end + 1]),
                )?;
            }
        }

        if verbose {
            info!(group = i + 1, n_groups, "forecast progress");
        }
    }

    let columns = layout.columns();
    let fitted = match fitted {
        Some(values) => {
            let mut fitted_columns = Vec::with_capacity(columns.len() + 1);
            fitted_columns.push("y".to_string());
            fitted_columns.extend(columns.iter().cloned());
            Some(FittedValues::new(values, fitted_columns)?)
        }
        None => None,
    };
    Ok(ForecastOutput {
        forecasts: ForecastMatrix::new(forecasts, columns)?,
        fitted,
    })
}
