//! Structured model outputs holding point forecasts and interval bounds.

/// Prediction interval bounds for one confidence level.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Confidence level in percent, e.g. `95.0`.
    pub level: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Interval {
    pub fn new(level: f64, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            level,
            lower,
            upper,
        }
    }
}

/// Two levels are the same when they agree up to floating-point noise.
pub(crate) fn same_level(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn find_interval(intervals: &[Interval], level: f64) -> Option<&Interval> {
    intervals.iter().find(|i| same_level(i.level, level))
}

/// In-sample reconstruction of the training range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InSample {
    pub mean: Vec<f64>,
    pub intervals: Vec<Interval>,
}

impl InSample {
    pub fn from_values(mean: Vec<f64>) -> Self {
        Self {
            mean,
            intervals: Vec::new(),
        }
    }

    /// Add in-sample bounds for one level.
    pub fn with_interval(mut self, level: f64, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.intervals.push(Interval::new(level, lower, upper));
        self
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn interval(&self, level: f64) -> Option<&Interval> {
        find_interval(&self.intervals, level)
    }
}

/// Output of one model call for one series.
///
/// Carries the point forecast, one [`Interval`] per requested level and, when
/// asked for, the in-sample values over the training range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    mean: Vec<f64>,
    intervals: Vec<Interval>,
    fitted: Option<InSample>,
}

impl ModelOutput {
    /// Create an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an output from point predictions.
    pub fn from_values(mean: Vec<f64>) -> Self {
        Self {
            mean,
            intervals: Vec::new(),
            fitted: None,
        }
    }

    /// Add bounds for one confidence level.
    pub fn with_interval(mut self, level: f64, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.intervals.push(Interval::new(level, lower, upper));
        self
    }

    /// Add bounds for several levels at once.
    pub fn with_intervals(mut self, intervals: Vec<Interval>) -> Self {
        self.intervals.extend(intervals);
        self
    }

    /// Attach in-sample values.
    pub fn with_fitted(mut self, fitted: InSample) -> Self {
        self.fitted = Some(fitted);
        self
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Bounds for `level`, looked up by value rather than position.
    pub fn interval(&self, level: f64) -> Option<&Interval> {
        find_interval(&self.intervals, level)
    }

    pub fn has_intervals(&self) -> bool {
        !self.intervals.is_empty()
    }

    pub fn fitted(&self) -> Option<&InSample> {
        self.fitted.as_ref()
    }
}
