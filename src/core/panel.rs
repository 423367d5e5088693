//! Conversion between a long table of `(id, timestamp, values)` rows and the
//! grouped buffer the engines work on.

use crate::core::GroupedBuffer;
use crate::engine::{CVConfig, CvFittedValues};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use ndarray::{s, Array2, Axis};
use std::collections::HashSet;

/// One observation of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub target: f64,
    /// Exogenous values observed alongside the target.
    pub exog: Vec<f64>,
}

impl TableRow {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, target: f64) -> Self {
        Self {
            id: id.into(),
            timestamp,
            target,
            exog: Vec::new(),
        }
    }

    pub fn with_exog(mut self, exog: Vec<f64>) -> Self {
        self.exog = exog;
        self
    }
}

/// One in-sample row of a cross-validation window.
#[derive(Debug, Clone, PartialEq)]
pub struct CvFittedRow {
    pub id: String,
    pub ds: DateTime<Utc>,
    /// Timestamp of the last training row of the window.
    pub cutoff: DateTime<Utc>,
    /// Target followed by one value per model.
    pub values: Vec<f64>,
}

/// Long table reshaped into a [`GroupedBuffer`] plus its row labels.
#[derive(Debug, Clone)]
pub struct Panel {
    buffer: GroupedBuffer,
    ids: Vec<String>,
    last_timestamps: Vec<DateTime<Utc>>,
    timestamps: Vec<DateTime<Utc>>,
}

impl Panel {
    /// Group `rows` by id.
    ///
    /// With `sort_required` the rows are first sorted by id and timestamp.
    /// Otherwise each id must occupy one contiguous run of rows. Timestamps
    /// must be strictly increasing within an id and every row must carry the
    /// same number of exogenous values.
    pub fn from_table(mut rows: Vec<TableRow>, sort_required: bool) -> Result<Panel> {
        if rows.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if sort_required {
            rows.sort_by(|a, b| a.id.cmp(&b.id).then(a.timestamp.cmp(&b.timestamp)));
        }

        let n_exog = rows[0].exog.len();
        let mut flat = Vec::with_capacity(rows.len() * (1 + n_exog));
        let mut indptr = vec![0];
        let mut ids: Vec<String> = Vec::new();
        let mut last_timestamps = Vec::new();
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();

        for (r, row) in rows.into_iter().enumerate() {
            if row.exog.len() != n_exog {
                return Err(ForecastError::DimensionMismatch {
                    expected: n_exog,
                    got: row.exog.len(),
                });
            }

            let same_group = ids.last().map_or(false, |id| *id == row.id);
            if same_group {
                let previous = last_timestamps[last_timestamps.len() - 1];
                if row.timestamp <= previous {
                    return Err(ForecastError::TimestampError(format!(
                        "timestamps of id '{}' must be strictly increasing",
                        row.id
                    )));
                }
                let last = last_timestamps.len() - 1;
                last_timestamps[last] = row.timestamp;
            } else {
                if !seen.insert(row.id.clone()) {
                    return Err(ForecastError::InvalidParameter(format!(
                        "rows of id '{}' are not contiguous, sort the table first",
                        row.id
                    )));
                }
                if r > 0 {
                    indptr.push(r);
                }
                ids.push(row.id);
                last_timestamps.push(row.timestamp);
            }

            timestamps.push(row.timestamp);
            flat.push(row.target);
            flat.extend_from_slice(&row.exog);
        }
        indptr.push(timestamps.len());

        let data = Array2::from_shape_vec((timestamps.len(), 1 + n_exog), flat)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        Ok(Panel {
            buffer: GroupedBuffer::new(data, indptr)?,
            ids,
            last_timestamps,
            timestamps,
        })
    }

    pub fn buffer(&self) -> &GroupedBuffer {
        &self.buffer
    }

    /// Ids in group order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Last timestamp of every group.
    pub fn last_timestamps(&self) -> &[DateTime<Utc>] {
        &self.last_timestamps
    }

    /// Timestamp of every buffer row.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// `(id, timestamp)` label of every buffer row.
    pub fn row_index(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut index = Vec::with_capacity(self.timestamps.len());
        for (g, id) in self.ids.iter().enumerate() {
            for r in self.buffer.group_range(g) {
                index.push((id.clone(), self.timestamps[r]));
            }
        }
        index
    }

    /// Split into the buffer, ids, last timestamps and row index.
    pub fn into_parts(
        self,
    ) -> (
        GroupedBuffer,
        Vec<String>,
        Vec<DateTime<Utc>>,
        Vec<(String, DateTime<Utc>)>,
    ) {
        let index = self.row_index();
        (self.buffer, self.ids, self.last_timestamps, index)
    }

    /// Labels of the `h` future rows of every group, group-major.
    pub fn future_index(&self, h: usize, freq: Duration) -> Result<Vec<(String, DateTime<Utc>)>> {
        let mut index = Vec::with_capacity(self.ids.len() * h);
        for (id, &last) in self.ids.iter().zip(&self.last_timestamps) {
            let mut ds = last;
            for _ in 0..h {
                ds = step(ds, freq)?;
                index.push((id.clone(), ds));
            }
        }
        Ok(index)
    }

    /// Labels `(id, ds, cutoff)` of the cross-validation rows.
    ///
    /// Rows are ordered by group, window and step, matching the forecast
    /// matrix of a cross-validation run with the same settings. The cutoff of
    /// a window is one `freq` before its first forecast timestamp.
    pub fn cv_index(
        &self,
        config: &CVConfig,
        freq: Duration,
    ) -> Result<Vec<(String, DateTime<Utc>, DateTime<Utc>)>> {
        config.validate()?;
        let h = config.horizon;
        let test_size = config.test_size();
        let n_windows = config.n_windows()?;

        let mut index = Vec::with_capacity(self.ids.len() * n_windows * h);
        for (g, id) in self.ids.iter().enumerate() {
            let rows = self.buffer.group_range(g);
            if rows.len() < test_size {
                return Err(ForecastError::InsufficientData {
                    needed: test_size,
                    got: rows.len(),
                });
            }
            for w in 0..n_windows {
                let start = rows.end - test_size + w * config.step_size;
                let cutoff = step(self.timestamps[start], -freq)?;
                for r in start..start + h {
                    index.push((id.clone(), self.timestamps[r], cutoff));
                }
            }
        }
        Ok(index)
    }

    /// Labelled in-sample rows of a cross-validation run, window by window.
    pub fn cv_fitted_rows(&self, fitted: &CvFittedValues) -> Result<Vec<CvFittedRow>> {
        if fitted.values.len_of(Axis(0)) != self.timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.timestamps.len(),
                got: fitted.values.len_of(Axis(0)),
            });
        }

        let mut out = Vec::new();
        for w in 0..fitted.n_windows() {
            for (g, id) in self.ids.iter().enumerate() {
                let rows = self.buffer.group_range(g);
                let cutoff = match rows.clone().find(|&r| fitted.last_train[[r, w]]) {
                    Some(r) => self.timestamps[r],
                    None => continue,
                };
                for r in rows.filter(|&r| fitted.in_window[[r, w]]) {
                    out.push(CvFittedRow {
                        id: id.clone(),
                        ds: self.timestamps[r],
                        cutoff,
                        values: fitted.values.slice(s![r, w, ..]).to_vec(),
                    });
                }
            }
        }
        Ok(out)
    }
}

fn step(ds: DateTime<Utc>, freq: Duration) -> Result<DateTime<Utc>> {
    ds.checked_add_signed(freq)
        .ok_or_else(|| ForecastError::TimestampError(format!("timestamp overflow after {}", ds)))
}
