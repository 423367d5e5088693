//! Result bundles returned by the engines and reassembled by the dispatcher.

use crate::error::{ForecastError, Result};
use ndarray::{concatenate, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

/// Dense result matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastMatrix {
    pub values: Array2<f64>,
    pub columns: Vec<String>,
}

/// In-sample values aligned with the input rows.
///
/// Column 0 is the original target (`"y"`), followed by the forecast columns.
pub type FittedValues = ForecastMatrix;

impl ForecastMatrix {
    pub fn new(values: Array2<f64>, columns: Vec<String>) -> Result<Self> {
        if values.ncols() != columns.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: columns.len(),
                got: values.ncols(),
            });
        }
        Ok(Self { values, columns })
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(idx))
    }

    /// Stack chunk results row-wise. Column names come from the first chunk.
    pub fn concat(parts: Vec<ForecastMatrix>) -> Result<ForecastMatrix> {
        let first = parts.first().ok_or(ForecastError::EmptyData)?;
        let columns = first.columns.clone();
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.values.view()).collect();
        let values = concatenate(Axis(0), &views)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        Ok(ForecastMatrix { values, columns })
    }
}

/// Output of the one-shot forecast engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutput {
    pub forecasts: ForecastMatrix,
    pub fitted: Option<FittedValues>,
}

impl ForecastOutput {
    pub fn concat(parts: Vec<ForecastOutput>) -> Result<ForecastOutput> {
        let with_fitted = parts.first().map_or(false, |p| p.fitted.is_some());
        let mut forecasts = Vec::with_capacity(parts.len());
        let mut fitted = Vec::with_capacity(parts.len());
        for part in parts {
            forecasts.push(part.forecasts);
            if let Some(f) = part.fitted {
                fitted.push(f);
            }
        }
        Ok(ForecastOutput {
            forecasts: ForecastMatrix::concat(forecasts)?,
            fitted: if with_fitted {
                Some(ForecastMatrix::concat(fitted)?)
            } else {
                None
            },
        })
    }
}

/// In-sample values recorded during cross-validation.
///
/// Axis 0 runs over input rows, axis 1 over windows. `in_window[[r, w]]` marks
/// the rows used to train window `w`; `last_train[[r, w]]` marks the last of
/// them in each group. Values outside a training slice are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CvFittedValues {
    /// Shape `(n_rows, n_windows, 1 + n_models)`, target in channel 0.
    pub values: Array3<f64>,
    pub in_window: Array2<bool>,
    pub last_train: Array2<bool>,
    /// `"y"` followed by the model names.
    pub columns: Vec<String>,
}

impl CvFittedValues {
    pub fn n_windows(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn concat(parts: Vec<CvFittedValues>) -> Result<CvFittedValues> {
        let first = parts.first().ok_or(ForecastError::EmptyData)?;
        let columns = first.columns.clone();

        let values: Vec<ArrayView3<'_, f64>> = parts.iter().map(|p| p.values.view()).collect();
        let in_window: Vec<ArrayView2<'_, bool>> =
            parts.iter().map(|p| p.in_window.view()).collect();
        let last_train: Vec<ArrayView2<'_, bool>> =
            parts.iter().map(|p| p.last_train.view()).collect();

        let shape_err = |e: ndarray::ShapeError| ForecastError::ComputationError(e.to_string());
        Ok(CvFittedValues {
            values: concatenate(Axis(0), &values).map_err(shape_err)?,
            in_window: concatenate(Axis(0), &in_window).map_err(shape_err)?,
            last_train: concatenate(Axis(0), &last_train).map_err(shape_err)?,
            columns,
        })
    }
}

/// Output of the cross-validation engine.
///
/// `forecasts` has one row per group, window and step, group-major, with the
/// held-out target in column `"y"`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationOutput {
    pub forecasts: ForecastMatrix,
    pub n_windows: usize,
    pub fitted: Option<CvFittedValues>,
}

impl CrossValidationOutput {
    pub fn concat(parts: Vec<CrossValidationOutput>) -> Result<CrossValidationOutput> {
        let first = parts.first().ok_or(ForecastError::EmptyData)?;
        let n_windows = first.n_windows;
        let with_fitted = first.fitted.is_some();

        let mut forecasts = Vec::with_capacity(parts.len());
        let mut fitted = Vec::with_capacity(parts.len());
        for part in parts {
            forecasts.push(part.forecasts);
            if let Some(f) = part.fitted {
                fitted.push(f);
            }
        }
        Ok(CrossValidationOutput {
            forecasts: ForecastMatrix::concat(forecasts)?,
            n_windows,
            fitted: if with_fitted {
                Some(CvFittedValues::concat(fitted)?)
            } else {
                None
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix(rows: Array2<f64>) -> ForecastMatrix {
        ForecastMatrix::new(rows, vec!["a".to_string(), "b".to_string()]).unwrap()
    }

    #[test]
    fn column_lookup_by_name() {
        let m = matrix(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(m.column("b").unwrap().to_vec(), vec![2.0, 4.0]);
        assert!(m.column("c").is_none());
        assert_eq!(m.n_rows(), 2);
    }

    #[test]
    fn new_checks_column_count() {
        assert!(ForecastMatrix::new(Array2::zeros((1, 3)), vec!["a".to_string()]).is_err());
    }

    #[test]
    fn concat_stacks_rows_in_order() {
        let merged = ForecastMatrix::concat(vec![
            matrix(array![[1.0, 2.0]]),
            matrix(array![[3.0, 4.0], [5.0, 6.0]]),
        ])
        .unwrap();
        assert_eq!(merged.values, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(merged.columns, vec!["a", "b"]);
    }

    #[test]
    fn concat_of_nothing_is_an_error() {
        assert_eq!(
            ForecastMatrix::concat(Vec::new()),
            Err(ForecastError::EmptyData)
        );
    }

    #[test]
    fn forecast_output_concat_keeps_fitted() {
        let part = |v: f64| ForecastOutput {
            forecasts: matrix(array![[v, v]]),
            fitted: Some(matrix(array![[v, -v]])),
        };
        let merged = ForecastOutput::concat(vec![part(1.0), part(2.0)]).unwrap();
        assert_eq!(merged.forecasts.n_rows(), 2);
        assert_eq!(merged.fitted.unwrap().values, array![[1.0, -1.0], [2.0, -2.0]]);
    }

    #[test]
    fn cv_fitted_concat_stacks_rows() {
        let part = |rows: usize| CvFittedValues {
            values: Array3::zeros((rows, 2, 2)),
            in_window: Array2::from_elem((rows, 2), true),
            last_train: Array2::from_elem((rows, 2), false),
            columns: vec!["y".to_string(), "Naive".to_string()],
        };
        let merged = CvFittedValues::concat(vec![part(3), part(4)]).unwrap();
        assert_eq!(merged.values.dim(), (7, 2, 2));
        assert_eq!(merged.in_window.dim(), (7, 2));
        assert_eq!(merged.n_windows(), 2);
    }
}
