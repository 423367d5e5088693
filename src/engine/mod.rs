//! Grouped-array engines.
//!
//! Every engine walks the groups of one [`GroupedBuffer`](crate::core::GroupedBuffer)
//! sequentially and writes each model's output into a dense result matrix
//! whose columns are planned by [`ColumnLayout`].

pub mod cross_validation;
pub mod fit_predict;
pub mod fitted;
pub mod layout;
pub mod results;

pub use cross_validation::{cross_validation, CVConfig, CVWindows};
pub use fit_predict::{
    fit, fit_predict, forecast, predict, validate_future_exog, validate_horizon, validate_models,
    validate_request,
};
pub use fitted::{FittedModels, FittedView};
pub use layout::ColumnLayout;
pub use results::{CrossValidationOutput, CvFittedValues, FittedValues, ForecastMatrix, ForecastOutput};
