//! Forecaster trait defining the contract every pluggable model implements.

use crate::core::{InSample, ModelOutput};
use crate::error::{ForecastError, Result};
use ndarray::ArrayView2;
use std::fmt;

/// Engine operation a capability refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Predicting from an already fitted model.
    Predict,
    /// One-shot fit and forecast without keeping state.
    Forecast,
}

/// Capabilities a model declares statically.
///
/// Interval support may differ between [`Operation::Predict`] and
/// [`Operation::Forecast`], so each is declared separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub predict_intervals: bool,
    pub forecast_intervals: bool,
}

impl Capabilities {
    /// Point forecasts only.
    pub const POINT: Capabilities = Capabilities {
        predict_intervals: false,
        forecast_intervals: false,
    };

    /// Intervals in both operations.
    pub const INTERVALS: Capabilities = Capabilities {
        predict_intervals: true,
        forecast_intervals: true,
    };

    /// Whether the model returns interval bounds for `operation`.
    pub fn supports_levels(&self, operation: Operation) -> bool {
        match operation {
            Operation::Predict => self.predict_intervals,
            Operation::Forecast => self.forecast_intervals,
        }
    }
}

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
/// A model instance fitted with [`Forecaster::fit`] is its own fitted state.
pub trait Forecaster: Send + Sync + fmt::Debug {
    /// Create an unfitted model with the same configuration.
    fn fresh(&self) -> BoxedForecaster;

    /// Fit the model to one series and its optional exogenous columns.
    fn fit(&mut self, y: &[f64], exog: Option<ArrayView2<'_, f64>>) -> Result<()>;

    /// Predict `horizon` steps from the fitted state.
    ///
    /// `levels` is empty unless the model declares interval support for
    /// [`Operation::Predict`].
    fn predict(
        &self,
        horizon: usize,
        future_exog: Option<ArrayView2<'_, f64>>,
        levels: &[f64],
    ) -> Result<ModelOutput>;

    /// Fit on `y` and forecast `horizon` steps without touching `self`.
    ///
    /// When `fitted` is set the output carries the in-sample values.
    fn forecast(
        &self,
        horizon: usize,
        y: &[f64],
        exog: Option<ArrayView2<'_, f64>>,
        future_exog: Option<ArrayView2<'_, f64>>,
        fitted: bool,
        levels: &[f64],
    ) -> Result<ModelOutput> {
        let mut model = self.fresh();
        model.fit(y, exog)?;
        let output = model.predict(horizon, future_exog, levels)?;
        if !fitted {
            return Ok(output);
        }
        let in_sample = model.fitted_values().ok_or(ForecastError::FitRequired)?;
        Ok(output.with_fitted(InSample::from_values(in_sample.to_vec())))
    }

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the model name, used verbatim as the output column name.
    fn name(&self) -> &str;

    /// Interval support per operation.
    fn capabilities(&self) -> Capabilities {
        Capabilities::POINT
    }

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use anofox_batch::models::{BoxedForecaster, Forecaster};
/// use anofox_batch::models::baseline::Naive;
///
/// let model: BoxedForecaster = Box::new(Naive::new());
/// assert_eq!(model.name(), "Naive");
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;

/// A model exposed under a different name.
///
/// Two identically configured models would otherwise write to the same output
/// columns, so one of them must be renamed.
#[derive(Debug)]
pub struct Aliased {
    alias: String,
    inner: BoxedForecaster,
}

impl Aliased {
    pub fn new(alias: impl Into<String>, inner: BoxedForecaster) -> Self {
        Self {
            alias: alias.into(),
            inner,
        }
    }
}

impl Forecaster for Aliased {
    fn fresh(&self) -> BoxedForecaster {
        Box::new(Aliased {
            alias: self.alias.clone(),
            inner: self.inner.fresh(),
        })
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

    fn forecast(
        &self,
        horizon: usize,
        y: &[f64],
        exog: Option<ArrayView2<'_, f64>>,
        future_exog: Option<ArrayView2<'_, f64>>,
        fitted: bool,
        levels: &[f64],
    ) -> Result<ModelOutput> {
        self.inner
            .forecast(horizon, y, exog, future_exog, fitted, levels)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.inner.fitted_values()
    }

    fn name(&self) -> &str {
        &self.alias
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }
}

/// Model specification for batch forecasting.
///
/// Contains a model factory function and the name under which its outputs are
/// reported.
///
/// # Example
///
/// ```
/// use anofox_batch::models::{Forecaster, ModelSpec};
/// use anofox_batch::models::baseline::{Naive, SeasonalNaive};
///
/// let specs = vec![
///     ModelSpec::new("Naive", || Box::new(Naive::new())),
///     ModelSpec::with_period("SeasonalNaive12", |p| Box::new(SeasonalNaive::new(p)), 12),
/// ];
///
/// for spec in &specs {
///     let model = spec.create();
///     assert!(!model.is_fitted());
///     assert_eq!(model.name(), spec.name);
/// }
/// ```
pub struct ModelSpec {
    /// Display name of the model
    pub name: String,
    /// Factory function to create a new instance
    factory: Box<dyn Fn() -> BoxedForecaster + Send + Sync>,
}

impl ModelSpec {
    /// Create a model spec with a simple factory.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Create a model spec with a period parameter.
    pub fn with_period<F>(name: impl Into<String>, factory: F, period: usize) -> Self
    where
        F: Fn(usize) -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move || factory(period)),
        }
    }

    /// Create a new model instance reporting under this name.
    pub fn create(&self) -> BoxedForecaster {
        let model = (self.factory)();
        if model.name() == self.name {
            model
        } else {
            Box::new(Aliased::new(self.name.clone(), model))
        }
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec").field("name", &self.name).finish()
    }
}

/// Collection of model specifications for batch forecasting.
///
/// # Example
///
/// ```
/// use anofox_batch::models::{ModelRegistry, ModelSpec};
/// use anofox_batch::models::baseline::Naive;
///
/// let mut registry = ModelRegistry::new();
/// registry.register(ModelSpec::new("Naive", || Box::new(Naive::new())));
///
/// let models = registry.create_all();
/// assert_eq!(models.len(), 1);
/// ```
#[derive(Debug)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Register a model specification.
    pub fn register(&mut self, spec: ModelSpec) {
        self.models.push(spec);
    }

    /// Get the number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate over model specifications.
    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    /// Instantiate every registered model in registration order.
    pub fn create_all(&self) -> Vec<BoxedForecaster> {
        self.models.iter().map(ModelSpec::create).collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
