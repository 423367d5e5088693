//! Core data structures shared by the engines.

mod grouped;
mod output;
pub mod panel;

pub use grouped::{split_ranges, GroupedBuffer};
pub use output::{InSample, Interval, ModelOutput};
pub use panel::{CvFittedRow, Panel, TableRow};
