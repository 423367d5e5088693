//! Forecasting models.

mod traits;

pub mod baseline;

pub use traits::{
    Aliased, BoxedForecaster, Capabilities, Forecaster, ModelRegistry, ModelSpec, Operation,
};
