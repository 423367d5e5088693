//! # anofox-batch
//!
//! Grouped-array engine for fitting, predicting and backtesting many
//! independent time-series models at once.
//!
//! Series of many entities share one contiguous [`GroupedBuffer`](core::GroupedBuffer).
//! The engines in [`engine`] drive any [`Forecaster`](models::Forecaster) over
//! every group and lay the outputs of heterogeneous models out in one dense
//! matrix. [`parallel`] fans chunks of groups out to a worker pool and
//! [`batch::BatchForecaster`] ties it together.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod batch;
pub mod core;
pub mod engine;
pub mod error;
pub mod models;
pub mod parallel;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::batch::{BatchConfig, BatchForecaster};
    pub use crate::core::{GroupedBuffer, ModelOutput, Panel, TableRow};
    pub use crate::engine::{CVConfig, ForecastMatrix};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::{BoxedForecaster, Forecaster};
    pub use crate::parallel::{RayonPool, SequentialPool, WorkerPool};
}
