//! Matrix of fitted models, one cell per group and model.

use crate::error::{ForecastError, Result};
use crate::models::{BoxedForecaster, Forecaster};
use std::ops::Range;

/// Fitted models in row-major order: cell `[i, m]` is model `m` fitted on
/// group `i`.
///
/// Built by the fit phase and only read afterwards.
#[derive(Debug)]
pub struct FittedModels {
    models: Vec<BoxedForecaster>,
    n_groups: usize,
    n_models: usize,
    n_features: usize,
}

impl FittedModels {
    /// Wrap `n_groups * n_models` fitted models stored row by row.
    ///
    /// `n_features` is the number of exogenous columns seen during fitting.
    pub fn new(
        models: Vec<BoxedForecaster>,
        n_groups: usize,
        n_models: usize,
        n_features: usize,
    ) -> Result<Self> {
        if models.len() != n_groups * n_models {
            return Err(ForecastError::DimensionMismatch {
                expected: n_groups * n_models,
                got: models.len(),
            });
        }
        Ok(Self {
            models,
            n_groups,
            n_models,
            n_features,
        })
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    pub fn n_models(&self) -> usize {
        self.n_models
    }

    /// Exogenous columns the models were fitted with.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Model `m` fitted on group `i`.
    pub fn get(&self, i: usize, m: usize) -> Option<&dyn Forecaster> {
        if i >= self.n_groups || m >= self.n_models {
            return None;
        }
        Some(self.models[i * self.n_models + m].as_ref())
    }

    /// Borrow every group.
    pub fn view(&self) -> FittedView<'_> {
        FittedView {
            models: &self.models,
            n_groups: self.n_groups,
            n_models: self.n_models,
            n_features: self.n_features,
        }
    }

    /// Borrow the groups in `groups`.
    pub fn rows(&self, groups: Range<usize>) -> Result<FittedView<'_>> {
        if groups.start > groups.end || groups.end > self.n_groups {
            return Err(ForecastError::IndexOutOfBounds {
                index: groups.end,
                size: self.n_groups,
            });
        }
        Ok(FittedView {
            models: &self.models[groups.start * self.n_models..groups.end * self.n_models],
            n_groups: groups.len(),
            n_models: self.n_models,
            n_features: self.n_features,
        })
    }

    /// Stack chunk results in order.
    pub fn concat(parts: Vec<FittedModels>) -> Result<FittedModels> {
        let first = parts.first().ok_or(ForecastError::EmptyData)?;
        let n_models = first.n_models;
        let n_features = first.n_features;
        if let Some(bad) = parts.iter().find(|p| p.n_models != n_models) {
            return Err(ForecastError::DimensionMismatch {
                expected: n_models,
                got: bad.n_models,
            });
        }

        let n_groups = parts.iter().map(|p| p.n_groups).sum();
        let mut models = Vec::with_capacity(n_groups * n_models);
        for part in parts {
            models.extend(part.models);
        }
        Ok(FittedModels {
            models,
            n_groups,
            n_models,
            n_features,
        })
    }
}

/// Borrowed window of a [`FittedModels`] matrix covering consecutive groups.
#[derive(Debug, Clone, Copy)]
pub struct FittedView<'a> {
    models: &'a [BoxedForecaster],
    n_groups: usize,
    n_models: usize,
    n_features: usize,
}

impl<'a> FittedView<'a> {
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    pub fn n_models(&self) -> usize {
        self.n_models
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Models fitted on group `i`, in model order.
    ///
    /// # Panics
    /// Panics if `i >= self.n_groups()`.
    pub fn row(&self, i: usize) -> &'a [BoxedForecaster] {
        &self.models[i * self.n_models..(i + 1) * self.n_models]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::baseline::{Naive, WindowAverage};

    fn fitted(n_groups: usize) -> FittedModels {
        let mut models: Vec<BoxedForecaster> = Vec::new();
        for i in 0..n_groups {
            let y = vec![i as f64; 3];
            let mut naive = Naive::new();
            naive.fit(&y, None).unwrap();
            let mut avg = WindowAverage::new(2);
            avg.fit(&y, None).unwrap();
            models.push(Box::new(naive));
            models.push(Box::new(avg));
        }
        FittedModels::new(models, n_groups, 2, 0).unwrap()
    }

    fn last_value(model: &dyn Forecaster) -> f64 {
        model.predict(1, None, &[]).unwrap().mean()[0]
    }

    #[test]
    fn cells_are_row_major() {
        let fitted = fitted(3);
        assert_eq!(fitted.n_groups(), 3);
        assert_eq!(fitted.get(2, 1).unwrap().name(), "WindowAverage");
        assert_eq!(last_value(fitted.get(2, 0).unwrap()), 2.0);
        assert!(fitted.get(3, 0).is_none());
        assert!(fitted.get(0, 2).is_none());
    }

    #[test]
    fn shape_is_checked() {
        let err = FittedModels::new(vec![Box::new(Naive::new())], 2, 1, 0).unwrap_err();
        assert_eq!(
            err,
            ForecastError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn rows_borrow_a_group_window() {
        let fitted = fitted(4);
        let view = fitted.rows(1..3).unwrap();
        assert_eq!(view.n_groups(), 2);
        assert_eq!(last_value(view.row(0)[0].as_ref()), 1.0);
        assert_eq!(last_value(view.row(1)[1].as_ref()), 2.0);
        assert!(fitted.rows(3..5).is_err());
    }

    #[test]
    fn concat_preserves_group_order() {
        let a = fitted(2);
        let b = fitted(1);
        let merged = FittedModels::concat(vec![a, b]).unwrap();
        assert_eq!(merged.n_groups(), 3);
        assert_eq!(last_value(merged.get(1, 0).unwrap()), 1.0);
        assert_eq!(last_value(merged.get(2, 0).unwrap()), 0.0);
        assert!(FittedModels::concat(Vec::new()).is_err());
    }
}
