//! Utility functions for forecasting models.

pub mod stats;

pub use stats::{normal_intervals, residual_sigma, validate_levels, z_score};
