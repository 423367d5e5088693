//! Baseline forecasting models.
//!
//! Simple methods that serve as benchmarks and as reference adapters for the
//! batch engines.

mod naive;
mod seasonal_naive;
mod sma;

pub use naive::Naive;
pub use seasonal_naive::SeasonalNaive;
pub use sma::{HistoricAverage, SimpleMovingAverage, WindowAverage};
