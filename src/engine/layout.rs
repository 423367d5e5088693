//! Column layout of the dense result matrix.
//!
//! Every model owns a contiguous span of output columns: one for the point
//! forecast plus a lower/upper pair per requested level when the model
//! declares interval support for the operation being run.

use crate::core::{InSample, ModelOutput};
use crate::error::{ForecastError, Result};
use crate::models::{Forecaster, Operation};
use ndarray::{ArrayViewMut2, Axis};
use std::ops::Range;

/// Output column spans for an ordered list of models.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    cuts: Vec<usize>,
    has_level: Vec<bool>,
    names: Vec<String>,
    levels: Vec<f64>,
}

impl ColumnLayout {
    /// Compute the layout for `models` running `operation` with `levels`.
    ///
    /// # Example
    /// ```
    /// use anofox_batch::engine::ColumnLayout;
    /// use anofox_batch::models::baseline::{Naive, WindowAverage};
    /// use anofox_batch::models::{BoxedForecaster, Operation};
    ///
    /// let models: Vec<BoxedForecaster> = vec![Box::new(Naive::new()), Box::new(WindowAverage::new(3))];
    /// let layout = ColumnLayout::plan(models.iter().map(|m| m.as_ref()), Operation::Forecast, &[80.0, 95.0]);
    ///
    /// assert_eq!(layout.cuts(), &[0, 5, 6]);
    /// assert_eq!(
    ///     layout.columns(),
    ///     vec!["Naive", "Naive-lo-80", "Naive-hi-80", "Naive-lo-95", "Naive-hi-95", "WindowAverage"]
    /// );
    /// ```
    pub fn plan<'a, I>(models: I, operation: Operation, levels: &[f64]) -> Self
    where
        I: IntoIterator<Item = &'a dyn Forecaster>,
    {
        let mut cuts = vec![0];
        let mut has_level = Vec::new();
        let mut names = Vec::new();

        for model in models {
            let with_levels =
                model.capabilities().supports_levels(operation) && !levels.is_empty();
            let width = if with_levels { 1 + 2 * levels.len() } else { 1 };
            cuts.push(cuts[cuts.len() - 1] + width);
            has_level.push(with_levels);
            names.push(model.name().to_string());
        }

        Self {
            cuts,
            has_level,
            names,
            levels: levels.to_vec(),
        }
    }

    /// Cumulative column offsets, `n_models + 1` entries.
    pub fn cuts(&self) -> &[usize] {
        &self.cuts
    }

    pub fn n_models(&self) -> usize {
        self.has_level.len()
    }

    /// Whether model `m` writes interval columns.
    pub fn has_level(&self, m: usize) -> bool {
        self.has_level[m]
    }

    /// Levels to pass to model `m`: the requested ones, or none.
    pub fn levels_for(&self, m: usize) -> &[f64] {
        if self.has_level[m] {
            &self.levels
        } else {
            &[]
        }
    }

    /// Column span of model `m`.
    pub fn span(&self, m: usize) -> Range<usize> {
        self.cuts[m]..self.cuts[m + 1]
    }

    pub fn width(&self, m: usize) -> usize {
        self.cuts[m + 1] - self.cuts[m]
    }

    pub fn total_columns(&self) -> usize {
        self.cuts[self.cuts.len() - 1]
    }

    pub fn model_names(&self) -> &[String] {
        &self.names
    }

    /// Column names in layout order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.total_columns());
        for (m, name) in self.names.iter().enumerate() {
            columns.push(name.clone());
            if self.has_level[m] {
                for level in &self.levels {
                    columns.push(format!("{}-lo-{}", name, level));
                    columns.push(format!("{}-hi-{}", name, level));
                }
            }
        }
        columns
    }

    /// Write one model's output into its block of the result matrix.
    ///
    /// `dest` must be the `horizon x width(m)` window for model `m`. Bounds
    /// are looked up by level value.
    pub fn write_block(
        &self,
        m: usize,
        output: &ModelOutput,
        mut dest: ArrayViewMut2<'_, f64>,
    ) -> Result<()> {
        check_len(dest.nrows(), output.mean().len())?;
        copy_column(&mut dest, 0, output.mean());

        if !self.has_level[m] {
            return Ok(());
        }
        for (k, &level) in self.levels.iter().enumerate() {
            let interval = output
                .interval(level)
                .ok_or_else(|| ForecastError::MissingLevel {
                    model: self.names[m].clone(),
                    level,
                })?;
            check_len(dest.nrows(), interval.lower.len())?;
            check_len(dest.nrows(), interval.upper.len())?;
            copy_column(&mut dest, 1 + 2 * k, &interval.lower);
            copy_column(&mut dest, 2 + 2 * k, &interval.upper);
        }
        Ok(())
    }

    /// Write only the point forecast of `output` into column 0 of `dest`.
    ///
    /// Bound columns are left untouched.
    pub fn write_point(
        &self,
        output: &ModelOutput,
        mut dest: ArrayViewMut2<'_, f64>,
    ) -> Result<()> {
        check_len(dest.nrows(), output.mean().len())?;
        copy_column(&mut dest, 0, output.mean());
        Ok(())
    }

    /// Write in-sample values for model `m` into `dest`.
    ///
    /// Bounds the model did not report are left untouched.
    pub fn write_in_sample(
        &self,
        m: usize,
        in_sample: &InSample,
        mut dest: ArrayViewMut2<'_, f64>,
    ) -> Result<()> {
        check_len(dest.nrows(), in_sample.len())?;
        copy_column(&mut dest, 0, &in_sample.mean);

        if !self.has_level[m] {
            return Ok(());
        }
        for (k, &level) in self.levels.iter().enumerate() {
            if let Some(interval) = in_sample.interval(level) {
                check_len(dest.nrows(), interval.lower.len())?;
                check_len(dest.nrows(), interval.upper.len())?;
                copy_column(&mut dest, 1 + 2 * k, &interval.lower);
                copy_column(&mut dest, 2 + 2 * k, &interval.upper);
            }
        }
        Ok(())
    }
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ForecastError::DimensionMismatch { expected, got });
    }
    Ok(())
}

fn copy_column(dest: &mut ArrayViewMut2<'_, f64>, col: usize, values: &[f64]) {
    for (cell, &v) in dest.index_axis_mut(Axis(1), col).iter_mut().zip(values) {
        *cell = v;
    }
}
