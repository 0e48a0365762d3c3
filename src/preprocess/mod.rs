//! Feature preprocessing applied between ingest and model fitting.
//!
//! - standardization (`scaler`), shared verbatim with the inference path
//! - stratified train/test partitioning (`split`)
//! - synthetic minority oversampling of the training partition (`smote`)

pub mod scaler;
pub mod smote;
pub mod split;

pub use scaler::*;
pub use smote::*;
pub use split::*;
