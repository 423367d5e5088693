//! Fan-out/fan-in execution of the engines over group chunks.
//!
//! The dispatch functions split a buffer into contiguous chunks of groups,
//! run the matching engine on every chunk through a [`WorkerPool`] and stack
//! the chunk results back together in group order.

use crate::core::{split_ranges, GroupedBuffer};
use crate::engine::{
    self, validate_future_exog, validate_horizon, validate_request, CVConfig,
    CrossValidationOutput, FittedModels, ForecastMatrix, ForecastOutput,
};
use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Forecaster};
use crate::utils::validate_levels;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Executes a task over a list of chunks.
pub trait WorkerPool: Send + Sync {
    /// Run `task` on every chunk and return the results in submission order.
    ///
    /// When several chunks fail, the error of the earliest one is returned
    /// and every other result is discarded.
    fn run<T, R, F>(&self, chunks: Vec<T>, task: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Send + Sync;

    /// Number of chunks the pool can run at the same time.
    fn num_threads(&self) -> usize;
}

/// Runs chunks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPool;

impl WorkerPool for SequentialPool {
    fn run<T, R, F>(&self, chunks: Vec<T>, task: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Send + Sync,
    {
        chunks.into_iter().map(task).collect()
    }

    fn num_threads(&self) -> usize {
        1
    }
}

/// Runs chunks on a rayon thread pool.
#[derive(Debug, Clone, Default)]
pub struct RayonPool {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl RayonPool {
    /// Use rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Build a dedicated pool with `n_threads` workers.
    pub fn with_threads(n_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| ForecastError::WorkerPool(e.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

}

impl WorkerPool for RayonPool {
    fn run<T, R, F>(&self, chunks: Vec<T>, task: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Send + Sync,
    {
        let execute = || chunks.into_par_iter().map(&task).collect::<Vec<Result<R>>>();
        let results = match &self.pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        };
        results.into_iter().collect()
    }

    fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

/// Number of chunks to use for `n_groups` groups.
///
/// `None` asks for one chunk per thread of the pool that runs them,
/// `available`. The result never exceeds the group count and is at least one.
pub fn resolve_n_jobs(n_groups: usize, requested: Option<usize>, available: usize) -> usize {
    let n_jobs = requested.unwrap_or(available);
    n_jobs.min(n_groups).max(1)
}

fn slice_optional(buffer: Option<&GroupedBuffer>, range: Range<usize>) -> Result<Option<GroupedBuffer>> {
    buffer.map(|b| b.slice(range)).transpose()
}

fn buffer_chunks(
    buffer: &GroupedBuffer,
    future_exog: Option<&GroupedBuffer>,
    n_jobs: usize,
) -> Result<Vec<(usize, GroupedBuffer, Option<GroupedBuffer>)>> {
    split_ranges(buffer.len(), n_jobs)
        .into_iter()
        .map(|range| {
            Ok((
                range.start,
                buffer.slice(range.clone())?,
                slice_optional(future_exog, range)?,
            ))
        })
        .collect()
}

/// Fit every model on every group across `n_jobs` chunks.
pub fn fit<P: WorkerPool>(
    pool: &P,
    n_jobs: usize,
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
) -> Result<FittedModels> {
    if buffer.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    engine::validate_models(models)?;

    let chunks = buffer_chunks(buffer, None, n_jobs)?;
    debug!(n_jobs, n_chunks = chunks.len(), n_groups = buffer.len(), "dispatching fit");
    let parts = pool.run(chunks, |(offset, chunk, _)| {
        engine::fit(&chunk, models).map_err(|e| e.offset_group(offset))
    })?;
    FittedModels::concat(parts)
}

/// Predict from a fitted matrix across `n_jobs` chunks.
pub fn predict<P: WorkerPool>(
    pool: &P,
    n_jobs: usize,
    fitted: &FittedModels,
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

    let chunks = split_ranges(fitted.n_groups(), n_jobs)
        .into_iter()
        .map(|range| Ok((range.clone(), slice_optional(future_exog, range)?)))
        .collect::<Result<Vec<_>>>()?;
    debug!(n_jobs, n_chunks = chunks.len(), n_groups = fitted.n_groups(), "dispatching predict");
    let parts = pool.run(chunks, |(range, future)| {
        let offset = range.start;
        engine::predict(fitted.rows(range)?, h, future.as_ref(), levels)
            .map_err(|e| e.offset_group(offset))
    })?;
    ForecastMatrix::concat(parts)
}

/// Fit and predict across `n_jobs` chunks.
pub fn fit_predict<P: WorkerPool>(
    pool: &P,
    n_jobs: usize,
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
) -> Result<(FittedModels, ForecastMatrix)> {
    validate_request(buffer, models, h, future_exog, levels)?;

    let chunks = buffer_chunks(buffer, future_exog, n_jobs)?;
    debug!(n_jobs, n_chunks = chunks.len(), n_groups = buffer.len(), "dispatching fit_predict");
    let parts = pool.run(chunks, |(offset, chunk, future)| {
        engine::fit_predict(&chunk, models, h, future.as_ref(), levels)
            .map_err(|e| e.offset_group(offset))
    })?;

    let (fitted, forecasts): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
    Ok((FittedModels::concat(fitted)?, ForecastMatrix::concat(forecasts)?))
}

/// Stateless forecast across `n_jobs` chunks.
pub fn forecast<P: WorkerPool>(
    pool: &P,
    n_jobs: usize,
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    fallback: Option<&dyn Forecaster>,
    h: usize,
    future_exog: Option<&GroupedBuffer>,
    levels: &[f64],
    want_fitted: bool,
) -> Result<ForecastOutput> {
    validate_request(buffer, models, h, future_exog, levels)?;

    let chunks = buffer_chunks(buffer, future_exog, n_jobs)?;
    debug!(n_jobs, n_chunks = chunks.len(), n_groups = buffer.len(), "dispatching forecast");
    let parts = pool.run(chunks, |(offset, chunk, future)| {
        engine::forecast(
            &chunk,
            models,
            fallback,
            h,
            future.as_ref(),
            levels,
            want_fitted,
            false,
        )
        .map_err(|e| e.offset_group(offset))
    })?;
    ForecastOutput::concat(parts)
}

/// Cross-validate across `n_jobs` chunks.
pub fn cross_validation<P: WorkerPool>(
    pool: &P,
    n_jobs: usize,
    buffer: &GroupedBuffer,
    models: &[BoxedForecaster],
    config: &CVConfig,
    levels: &[f64],
    want_fitted: bool,
) -> Result<CrossValidationOutput> {
    if buffer.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    engine::validate_models(models)?;
    let n_windows = config.n_windows()?;
    validate_levels(levels)?;

    let chunks = buffer_chunks(buffer, None, n_jobs)?;
    debug!(
        n_jobs,
        n_chunks = chunks.len(),
        n_groups = buffer.len(),
        n_windows,
        "dispatching cross_validation"
    );
    let parts = pool.run(chunks, |(offset, chunk, _)| {
        engine::cross_validation(&chunk, models, config, levels, want_fitted, false)
            .map_err(|e| e.offset_group(offset))
    })?;
    CrossValidationOutput::concat(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::baseline::{Naive, SeasonalNaive, WindowAverage};

    fn buffer(n_groups: usize) -> GroupedBuffer {
        let series: Vec<Vec<f64>> = (0..n_groups)
            .map(|g| (0..8 + g % 5).map(|t| (g * 10 + t) as f64).collect())
            .collect();
        GroupedBuffer::from_series(&series)
    }

    fn models() -> Vec<BoxedForecaster> {
        vec![Box::new(Naive::new()), Box::new(WindowAverage::new(3))]
    }

    #[test]
    fn resolve_n_jobs_clamps_to_groups() {
        assert_eq!(resolve_n_jobs(3, Some(8), 2), 3);
        assert_eq!(resolve_n_jobs(10, Some(4), 2), 4);
        assert_eq!(resolve_n_jobs(0, Some(4), 2), 1);
        assert_eq!(resolve_n_jobs(5, Some(0), 2), 1);
        assert_eq!(resolve_n_jobs(1000, None, 6), 6);
        assert_eq!(resolve_n_jobs(1, None, 6), 1);
        assert_eq!(resolve_n_jobs(10, None, 0), 1);
    }

    #[test]
    fn pools_keep_submission_order() {
        let chunks: Vec<usize> = (0..50).collect();
        let seq = SequentialPool.run(chunks.clone(), |x| Ok(x * 2)).unwrap();
        let par = RayonPool::with_threads(4)
            .unwrap()
            .run(chunks, |x| Ok(x * 2))
            .unwrap();
        assert_eq!(seq, par);
        assert_eq!(par[49], 98);
    }

    #[test]
    fn earliest_failing_chunk_is_reported() {
        let task = |x: usize| {
            if x % 7 == 3 {
                Err(ForecastError::InvalidParameter(format!("chunk {}", x)))
            } else {
                Ok(x)
            }
        };
        let chunks: Vec<usize> = (0..40).collect();
        let pool = RayonPool::with_threads(4).unwrap();
        assert_eq!(
            pool.run(chunks.clone(), task),
            Err(ForecastError::InvalidParameter("chunk 3".to_string()))
        );
        assert_eq!(
            SequentialPool.run(chunks, task),
            Err(ForecastError::InvalidParameter("chunk 3".to_string()))
        );
    }

    #[test]
    fn global_pool_reports_threads() {
        assert!(RayonPool::global().num_threads() >= 1);
        assert_eq!(RayonPool::with_threads(2).unwrap().num_threads(), 2);
        assert_eq!(SequentialPool.num_threads(), 1);
    }

    #[test]
    fn parallel_forecast_matches_sequential_engine() {
        let buffer = buffer(13);
        let models = models();
        let expected =
            engine::forecast(&buffer, &models, None, 3, None, &[80.0], true, false).unwrap();

        let pool = RayonPool::with_threads(4).unwrap();
        let got = forecast(&pool, 4, &buffer, &models, None, 3, None, &[80.0], true).unwrap();
        assert_eq!(got.forecasts.columns, expected.forecasts.columns);
        assert_eq!(got.forecasts.values, expected.forecasts.values);
        let (a, b) = (got.fitted.unwrap(), expected.fitted.unwrap());
        assert_eq!(a.columns, b.columns);
        for (x, y) in a.values.iter().zip(b.values.iter()) {
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
    }

    #[test]
    fn parallel_fit_then_predict_matches_fit_predict() {
        let buffer = buffer(9);
        let models = models();
        let pool = RayonPool::with_threads(3).unwrap();

        let fitted = fit(&pool, 3, &buffer, &models).unwrap();
        assert_eq!(fitted.n_groups(), 9);
        let predicted = predict(&pool, 3, &fitted, 2, None, &[95.0]).unwrap();

        let (_, expected) = fit_predict(&SequentialPool, 1, &buffer, &models, 2, None, &[95.0])
            .unwrap();
        assert_eq!(predicted, expected);
    }

    #[test]
    fn parallel_cross_validation_matches_sequential_engine() {
        let buffer = buffer(11);
        let models = models();
        let config = CVConfig::new(2, 4).with_step_size(2);

        let expected =
            engine::cross_validation(&buffer, &models, &config, &[], false, false).unwrap();
        let got = cross_validation(&RayonPool::global(), 5, &buffer, &models, &config, &[], false)
            .unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn model_failures_report_global_group_index() {
        let mut series: Vec<Vec<f64>> = vec![vec![1.0; 10]; 8];
        series[6] = vec![1.0; 3];
        let buffer = GroupedBuffer::from_series(&series);
        let models: Vec<BoxedForecaster> = vec![Box::new(SeasonalNaive::new(5))];

        let err = fit(&RayonPool::with_threads(4).unwrap(), 4, &buffer, &models).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFailed { group: 6, .. }));
    }
}
