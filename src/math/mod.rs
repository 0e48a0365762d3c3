//! Mathematical utilities: linear solves, logistic link, summary statistics.

pub mod linalg;
pub mod stats;

pub use linalg::*;
pub use stats::*;
