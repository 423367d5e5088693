//! High-level entry point that owns the models and picks the execution path.

use crate::core::GroupedBuffer;
use crate::engine::{
    self, validate_models, CVConfig, CrossValidationOutput, FittedModels, ForecastMatrix,
    ForecastOutput,
};
use crate::error::{ForecastError, Result};
use crate::models::BoxedForecaster;
use crate::parallel::{self, resolve_n_jobs, RayonPool, WorkerPool};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Execution settings for [`BatchForecaster`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of chunks to run concurrently (None = one per pool thread).
    pub n_jobs: Option<usize>,
    /// Log per-group progress on sequential runs.
    pub verbose: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            n_jobs: Some(1),
            verbose: false,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent chunks.
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Use every available thread.
    pub fn with_all_cores(mut self) -> Self {
        self.n_jobs = None;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Fits, predicts and backtests a list of models over every group of a buffer.
///
/// Runs with one job call the engines directly on the calling thread; larger
/// job counts split the groups into chunks and run them on the pool.
///
/// # Example
/// ```
/// use anofox_batch::batch::{BatchConfig, BatchForecaster};
/// use anofox_batch::core::GroupedBuffer;
/// use anofox_batch::models::BoxedForecaster;
/// use anofox_batch::models::baseline::{Naive, WindowAverage};
///
/// let buffer = GroupedBuffer::from_series(&[
///     vec![1.0, 2.0, 3.0, 4.0],
///     vec![10.0, 20.0, 30.0],
/// ]);
/// let models: Vec<BoxedForecaster> = vec![Box::new(Naive::new()), Box::new(WindowAverage::new(2))];
///
/// let forecaster = BatchForecaster::new(models)
///     .unwrap()
///     .with_config(BatchConfig::new().with_n_jobs(2));
/// let out = forecaster.forecast(&buffer, 2, None, &[80.0], false).unwrap();
///
/// assert_eq!(out.forecasts.columns, vec!["Naive", "Naive-lo-80", "Naive-hi-80", "WindowAverage"]);
/// assert_eq!(out.forecasts.column("Naive").unwrap().to_vec(), vec![4.0, 4.0, 30.0, 30.0]);
/// ```
#[derive(Debug)]
pub struct BatchForecaster<P: WorkerPool = RayonPool> {
    models: Vec<BoxedForecaster>,
    fallback: Option<BoxedForecaster>,
    config: BatchConfig,
    pool: P,
    fitted: Option<FittedModels>,
}

impl BatchForecaster<RayonPool> {
    /// Create a forecaster running on rayon's global pool.
    pub fn new(models: Vec<BoxedForecaster>) -> Result<Self> {
        Self::with_pool(models, RayonPool::global())
    }
}

impl<P: WorkerPool> BatchForecaster<P> {
    /// Create a forecaster running chunks on `pool`.
    pub fn with_pool(models: Vec<BoxedForecaster>, pool: P) -> Result<Self> {
        validate_models(&models)?;
        Ok(Self {
            models,
            fallback: None,
            config: BatchConfig::default(),
            pool,
            fitted: None,
        })
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Model used by [`BatchForecaster::forecast`] when a model fails on a group.
    pub fn with_fallback(mut self, fallback: BoxedForecaster) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn models(&self) -> &[BoxedForecaster] {
        &self.models
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Models fitted by the last call to [`BatchForecaster::fit`].
    pub fn fitted(&self) -> Option<&FittedModels> {
        self.fitted.as_ref()
    }

    fn n_jobs(&self, n_groups: usize) -> usize {
        resolve_n_jobs(n_groups, self.config.n_jobs, self.pool.num_threads())
    }

    /// Fit every model on every group and keep the fitted matrix.
    pub fn fit(&mut self, buffer: &GroupedBuffer) -> Result<()> {
        let n_jobs = self.n_jobs(buffer.len());
        let fitted = if n_jobs == 1 {
            engine::fit(buffer, &self.models)?
        } else {
            parallel::fit(&self.pool, n_jobs, buffer, &self.models)?
        };
        if self.config.verbose {
            info!(n_groups = fitted.n_groups(), n_models = fitted.n_models(), "fit finished");
        }
        self.fitted = Some(fitted);
        Ok(())
    }

    /// Predict `h` steps from the models fitted last.
    pub fn predict(
        &self,
        h: usize,
        future_exog: Option<&GroupedBuffer>,
        levels: &[f64],
    ) -> Result<ForecastMatrix> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::FitRequired)?;
        let n_jobs = self.n_jobs(fitted.n_groups());
        if n_jobs == 1 {
            engine::predict(fitted.view(), h, future_exog, levels)
        } else {
            parallel::predict(&self.pool, n_jobs, fitted, h, future_exog, levels)
        }
    }

    /// Fit on `buffer`, keep the fitted matrix and predict `h` steps.
    pub fn fit_predict(
        &mut self,
        buffer: &GroupedBuffer,
        h: usize,
        future_exog: Option<&GroupedBuffer>,
        levels: &[f64],
    ) -> Result<ForecastMatrix> {
        let n_jobs = self.n_jobs(buffer.len());
        let (fitted, forecasts) = if n_jobs == 1 {
            engine::fit_predict(buffer, &self.models, h, future_exog, levels)?
        } else {
            parallel::fit_predict(&self.pool, n_jobs, buffer, &self.models, h, future_exog, levels)?
        };
        self.fitted = Some(fitted);
        Ok(forecasts)
    }

    /// Forecast `h` steps without keeping any fitted state.
    pub fn forecast(
        &self,
        buffer: &GroupedBuffer,
        h: usize,
        future_exog: Option<&GroupedBuffer>,
        levels: &[f64],
        want_fitted: bool,
    ) -> Result<ForecastOutput> {
        let n_jobs = self.n_jobs(buffer.len());
        debug!(n_jobs, n_groups = buffer.len(), h, "forecast");
        let fallback = self.fallback.as_deref();
        if n_jobs == 1 {
            engine::forecast(
                buffer,
                &self.models,
                fallback,
                h,
                future_exog,
                levels,
                want_fitted,
                self.config.verbose,
            )
        } else {
            parallel::forecast(
                &self.pool,
                n_jobs,
                buffer,
                &self.models,
                fallback,
                h,
                future_exog,
                levels,
                want_fitted,
            )
        }
    }

    /// Backtest every model over rolling windows.
    pub fn cross_validation(
        &self,
        buffer: &GroupedBuffer,
        config: &CVConfig,
        levels: &[f64],
        want_fitted: bool,
    ) -> Result<CrossValidationOutput> {
        let n_jobs = self.n_jobs(buffer.len());
        debug!(n_jobs, n_groups = buffer.len(), h = config.horizon, "cross_validation");
        if n_jobs == 1 {
            engine::cross_validation(
                buffer,
                &self.models,
                config,
                levels,
                want_fitted,
                self.config.verbose,
            )
        } else {
            parallel::cross_validation(
                &self.pool,
                n_jobs,
                buffer,
                &self.models,
                config,
                levels,
                want_fitted,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::baseline::{Naive, SeasonalNaive, WindowAverage};
    use crate::models::Aliased;
    use crate::parallel::SequentialPool;

    fn buffer() -> GroupedBuffer {
        let series: Vec<Vec<f64>> = (0..6)
            .map(|g| (0..10 + g).map(|t| ((g + 1) * t) as f64).collect())
            .collect();
        GroupedBuffer::from_series(&series)
    }

    fn models() -> Vec<BoxedForecaster> {
        vec![Box::new(Naive::new()), Box::new(WindowAverage::new(3))]
    }

    #[test]
    fn config_defaults_to_one_job() {
        let config = BatchConfig::default();
        assert_eq!(config.n_jobs, Some(1));
        assert!(!config.verbose);
        assert_eq!(BatchConfig::new().with_all_cores().n_jobs, None);
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = BatchConfig::new().with_n_jobs(4).with_verbose(true);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"n_jobs":4,"verbose":true}"#);
        let back: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let all: BatchConfig = serde_json::from_str(r#"{"n_jobs":null,"verbose":false}"#).unwrap();
        assert_eq!(all.n_jobs, None);
    }

    #[test]
    fn all_cores_resolves_against_the_injected_pool() {
        let dedicated = BatchForecaster::with_pool(models(), RayonPool::with_threads(2).unwrap())
            .unwrap()
            .with_config(BatchConfig::new().with_all_cores());
        assert_eq!(dedicated.n_jobs(100), 2);
        assert_eq!(dedicated.n_jobs(1), 1);

        let sequential = BatchForecaster::with_pool(models(), SequentialPool)
            .unwrap()
            .with_config(BatchConfig::new().with_all_cores());
        assert_eq!(sequential.n_jobs(100), 1);

        let explicit = BatchForecaster::with_pool(models(), SequentialPool)
            .unwrap()
            .with_config(BatchConfig::new().with_n_jobs(4));
        assert_eq!(explicit.n_jobs(100), 4);
    }

    #[test]
    fn duplicate_names_are_rejected_up_front() {
        let models: Vec<BoxedForecaster> = vec![Box::new(Naive::new()), Box::new(Naive::new())];
        assert!(matches!(
            BatchForecaster::new(models),
            Err(ForecastError::InvalidParameter(_))
        ));

        let renamed: Vec<BoxedForecaster> = vec![
            Box::new(Naive::new()),
            Box::new(Aliased::new("Naive2", Box::new(Naive::new()))),
        ];
        assert!(BatchForecaster::new(renamed).is_ok());
    }

    #[test]
    fn predict_requires_fit() {
        let forecaster = BatchForecaster::new(models()).unwrap();
        assert_eq!(
            forecaster.predict(2, None, &[]).unwrap_err(),
            ForecastError::FitRequired
        );
    }

    #[test]
    fn fit_then_predict_matches_fit_predict() {
        let buffer = buffer();
        let mut a = BatchForecaster::new(models()).unwrap();
        a.fit(&buffer).unwrap();
        assert_eq!(a.fitted().unwrap().n_groups(), 6);
        let predicted = a.predict(3, None, &[90.0]).unwrap();

        let mut b = BatchForecaster::new(models())
            .unwrap()
            .with_config(BatchConfig::new().with_n_jobs(3));
        let combined = b.fit_predict(&buffer, 3, None, &[90.0]).unwrap();
        assert_eq!(predicted, combined);
        assert!(b.fitted().is_some());
    }

    #[test]
    fn job_count_does_not_change_results() {
        let buffer = buffer();
        let config = CVConfig::new(2, 4).with_step_size(2);
        let sequential = BatchForecaster::with_pool(models(), SequentialPool).unwrap();
        let parallel = BatchForecaster::new(models())
            .unwrap()
            .with_config(BatchConfig::new().with_n_jobs(4));

        assert_eq!(
            sequential.forecast(&buffer, 2, None, &[80.0], false).unwrap(),
            parallel.forecast(&buffer, 2, None, &[80.0], false).unwrap()
        );
        assert_eq!(
            sequential.cross_validation(&buffer, &config, &[], false).unwrap(),
            parallel.cross_validation(&buffer, &config, &[], false).unwrap()
        );
    }

    #[test]
    fn fallback_is_used_by_forecast_only() {
        let buffer = buffer();
        let models: Vec<BoxedForecaster> = vec![Box::new(SeasonalNaive::new(12))];
        let forecaster = BatchForecaster::new(models)
            .unwrap()
            .with_fallback(Box::new(Naive::new()))
            .with_config(BatchConfig::new().with_n_jobs(2));

        // Groups 0 and 1 are shorter than one season.
        let out = forecaster.forecast(&buffer, 1, None, &[], false).unwrap();
        let column = out.forecasts.column("SeasonalNaive").unwrap();
        assert_eq!(column[0], 9.0);
        assert_eq!(column[1], 20.0);
        // Group 2 has 12 rows and uses the seasonal model itself.
        assert_eq!(column[2], 0.0);

        let err = forecaster
            .cross_validation(&buffer, &CVConfig::new(1, 1), &[], false)
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFailed { group: 0, .. }));
    }
}
