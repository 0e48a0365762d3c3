//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the feature catalog and the trained `FeatureSchema`
//! - labeled datasets and their train/test partitions
//! - prediction outputs (`PredictionResult`, `RiskCategory`)
//! - the resolved training configuration (`TrainConfig`)

pub mod types;

pub use types::*;
