//! Input/output helpers.
//!
//! - CSV dataset ingest + validation (`ingest`)
//! - versioned artifact persistence (`artifacts`)
//! - metrics and dataset exports (`export`)

pub mod artifacts;
pub mod export;
pub mod ingest;

pub use artifacts::*;
pub use export::*;
pub use ingest::*;
