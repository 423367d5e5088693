//! Error types for the anofox-batch library.

use thiserror::Error;

/// Result type alias for batch forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while building buffers or running the engines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Two-dimensional shape mismatch, e.g. a future exogenous buffer.
    #[error("expected shape {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// A model output did not carry a requested interval level.
    #[error("model {model} did not return interval for level {level}")]
    MissingLevel { model: String, level: f64 },

    /// A model failed on one group.
    #[error("model {model} failed on group {group}: {message}")]
    ModelFailed {
        model: String,
        group: usize,
        message: String,
    },

    /// The worker pool could not be built or a worker failed to run.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl ForecastError {
    /// Wrap an error raised by a model call with the model name and group index.
    pub fn model_failed(model: &str, group: usize, source: &ForecastError) -> Self {
        match source {
            ForecastError::ModelFailed { message, .. } => ForecastError::ModelFailed {
                model: model.to_string(),
                group,
                message: message.clone(),
            },
            other => ForecastError::ModelFailed {
                model: model.to_string(),
                group,
                message: other.to_string(),
            },
        }
    }

    /// Re-base the group index of a [`ForecastError::ModelFailed`] raised
    /// inside a chunk that starts at group `offset`.
    pub fn offset_group(self, offset: usize) -> Self {
        match self {
            ForecastError::ModelFailed {
                model,
                group,
                message,
            } => ForecastError::ModelFailed {
                model,
                group: group + offset,
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ForecastError::ShapeMismatch {
            expected: (6, 2),
            got: (6, 1),
        };
        assert_eq!(err.to_string(), "expected shape (6, 2), got (6, 1)");

        let err = ForecastError::MissingLevel {
            model: "Naive".to_string(),
            level: 80.0,
        };
        assert_eq!(
            err.to_string(),
            "model Naive did not return interval for level 80"
        );
    }

    #[test]
    fn model_failed_wraps_the_source_message() {
        let source = ForecastError::InsufficientData { needed: 12, got: 3 };
        let err = ForecastError::model_failed("SeasonalNaive", 4, &source);
        assert_eq!(
            err.to_string(),
            "model SeasonalNaive failed on group 4: insufficient data: need at least 12, got 3"
        );
    }

    #[test]
    fn model_failed_does_not_nest() {
        let inner = ForecastError::ModelFailed {
            model: "Inner".to_string(),
            group: 0,
            message: "boom".to_string(),
        };
        let err = ForecastError::model_failed("Outer", 2, &inner);
        assert_eq!(err.to_string(), "model Outer failed on group 2: boom");
    }

    #[test]
    fn offset_group_only_touches_model_failures() {
        let err = ForecastError::model_failed("Naive", 1, &ForecastError::EmptyData);
        match err.offset_group(10) {
            ForecastError::ModelFailed { group, .. } => assert_eq!(group, 11),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            ForecastError::EmptyData.offset_group(10),
            ForecastError::EmptyData
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::FitRequired;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
