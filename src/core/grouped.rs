//! Ragged-array storage for many series sharing one contiguous buffer.
//!
//! A [`GroupedBuffer`] stores the rows of every group back to back in a single
//! two-dimensional array. Group boundaries are kept in a CSR-style `indptr`
//! vector: group `i` occupies rows `indptr[i]..indptr[i + 1]`.

use crate::error::{ForecastError, Result};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::fmt;
use std::ops::Range;

/// Relative tolerance used by the approximate equality on data.
const RTOL: f64 = 1e-5;
/// Absolute tolerance used by the approximate equality on data.
const ATOL: f64 = 1e-8;

/// Many variable-length series stored in one buffer.
///
/// Column 0 of `data` holds the target value; any remaining columns are
/// exogenous features aligned with the target. Buffers holding only future
/// exogenous values use every column as a feature.
#[derive(Debug, Clone)]
pub struct GroupedBuffer {
    data: Array2<f64>,
    indptr: Vec<usize>,
}

impl GroupedBuffer {
    /// Create a buffer from its rows and group boundaries.
    ///
    /// `indptr` must start at 0, be non-decreasing and end at `data.nrows()`.
    pub fn new(data: Array2<f64>, indptr: Vec<usize>) -> Result<Self> {
        let first = *indptr.first().ok_or_else(|| {
            ForecastError::InvalidParameter("indptr must contain at least one entry".to_string())
        })?;
        if first != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "indptr must start at 0, got {}",
                first
            )));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(ForecastError::InvalidParameter(
                "indptr must be non-decreasing".to_string(),
            ));
        }
        let last = indptr[indptr.len() - 1];
        if last != data.nrows() {
            return Err(ForecastError::DimensionMismatch {
                expected: data.nrows(),
                got: last,
            });
        }
        Ok(Self { data, indptr })
    }

    /// Build a single-column buffer from one vector of target values per group.
    pub fn from_series(series: &[Vec<f64>]) -> Self {
        let mut indptr = Vec::with_capacity(series.len() + 1);
        indptr.push(0);
        let mut values = Vec::with_capacity(series.iter().map(Vec::len).sum());
        for s in series {
            values.extend_from_slice(s);
            indptr.push(values.len());
        }
        let data = Array1::from(values).insert_axis(Axis(1));
        Self { data, indptr }
    }

    /// Stack per-group matrices that share the same column count.
    pub fn from_groups(groups: &[Array2<f64>]) -> Result<Self> {
        let first = groups.first().ok_or(ForecastError::EmptyData)?;
        let n_cols = first.ncols();
        if let Some(bad) = groups.iter().find(|g| g.ncols() != n_cols) {
            return Err(ForecastError::DimensionMismatch {
                expected: n_cols,
                got: bad.ncols(),
            });
        }

        let mut indptr = Vec::with_capacity(groups.len() + 1);
        indptr.push(0);
        for g in groups {
            indptr.push(indptr[indptr.len() - 1] + g.nrows());
        }
        let views: Vec<ArrayView2<'_, f64>> = groups.iter().map(|g| g.view()).collect();
        let data = concatenate(Axis(0), &views)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        Ok(Self { data, indptr })
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Check if the buffer holds no groups.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of rows across all groups.
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns (target plus features).
    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    /// Number of exogenous feature columns next to the target.
    pub fn n_features(&self) -> usize {
        self.n_columns().saturating_sub(1)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Row range of group `i` inside the shared buffer.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn group_range(&self, i: usize) -> Range<usize> {
        self.indptr[i]..self.indptr[i + 1]
    }

    /// Number of rows in group `i`.
    pub fn group_len(&self, i: usize) -> usize {
        self.indptr[i + 1] - self.indptr[i]
    }

    /// All rows of group `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn group(&self, i: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![self.group_range(i), ..])
    }

    /// All rows of group `i`, or `None` when out of range.
    pub fn get(&self, i: usize) -> Option<ArrayView2<'_, f64>> {
        (i < self.len()).then(|| self.group(i))
    }

    /// Target column of group `i`.
    pub fn target(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![self.group_range(i), 0])
    }

    /// Exogenous columns of group `i`, `None` for a single-column buffer.
    pub fn exog(&self, i: usize) -> Option<ArrayView2<'_, f64>> {
        (self.n_columns() > 1).then(|| self.data.slice(s![self.group_range(i), 1..]))
    }

    /// Copy groups `groups.start..groups.end` into an independent buffer.
    ///
    /// The returned `indptr` is re-based to start at zero and the data window is
    /// deep-copied, so the result never aliases `self`.
    pub fn slice(&self, groups: Range<usize>) -> Result<GroupedBuffer> {
        if groups.start > groups.end {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid group range {}..{}",
                groups.start, groups.end
            )));
        }
        if groups.end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: groups.end,
                size: self.len(),
            });
        }

        let bounds = &self.indptr[groups.start..=groups.end];
        let offset = bounds[0];
        let end = bounds[bounds.len() - 1];
        Ok(GroupedBuffer {
            data: self.data.slice(s![offset..end, ..]).to_owned(),
            indptr: bounds.iter().map(|p| p - offset).collect(),
        })
    }

    /// Partition the groups into at most `n_chunks` contiguous chunks.
    ///
    /// Chunk sizes differ by at most one group and empty chunks are dropped.
    pub fn split(&self, n_chunks: usize) -> Result<Vec<GroupedBuffer>> {
        split_ranges(self.len(), n_chunks)
            .into_iter()
            .map(|range| self.slice(range))
            .collect()
    }

    /// Concatenate buffers in order, the inverse of [`GroupedBuffer::split`].
    pub fn concat(parts: &[GroupedBuffer]) -> Result<GroupedBuffer> {
        let first = parts.first().ok_or(ForecastError::EmptyData)?;
        let n_cols = first.n_columns();
        if let Some(bad) = parts.iter().find(|p| p.n_columns() != n_cols) {
            return Err(ForecastError::DimensionMismatch {
                expected: n_cols,
                got: bad.n_columns(),
            });
        }

        let mut indptr = vec![0];
        for part in parts {
            let offset = indptr[indptr.len() - 1];
            indptr.extend(part.indptr[1..].iter().map(|p| p + offset));
        }
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.data.view()).collect();
        let data = concatenate(Axis(0), &views)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        Ok(GroupedBuffer { data, indptr })
    }

    /// Iterate over group views in order.
    pub fn iter(&self) -> impl Iterator<Item = ArrayView2<'_, f64>> + '_ {
        (0..self.len()).map(move |i| self.group(i))
    }
}

/// Group ranges of an `n_chunks`-way split of `n_groups` groups.
///
/// The first `n_groups % n_chunks` chunks receive one extra group. Empty
/// chunks are dropped, so fewer than `n_chunks` ranges come back when there
/// are fewer groups than chunks.
pub fn split_ranges(n_groups: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let n_chunks = n_chunks.max(1);
    let base = n_groups / n_chunks;
    let extra = n_groups % n_chunks;

    let mut ranges = Vec::with_capacity(n_chunks);
    let mut start = 0;
    for chunk in 0..n_chunks {
        let size = if chunk < extra { base + 1 } else { base };
        if size > 0 {
            ranges.push(start..start + size);
        }
        start += size;
    }
    ranges
}

fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= ATOL + RTOL * b.abs()
}

impl PartialEq for GroupedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.indptr == other.indptr
            && self.data.dim() == other.data.dim()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| is_close(a, b))
    }
}

impl fmt::Display for GroupedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroupedBuffer(n_data={}, n_groups={})",
            self.data.len(),
            self.len()
        )
    }
}
