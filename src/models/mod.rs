//! Probabilistic binary classifiers and the soft-voting ensemble.
//!
//! All models are fitted on standardized feature rows and expose the
//! probability of the positive class per row. They are small, serializable
//! value types so the fitted ensemble can be persisted as one artifact.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod logistic;
pub mod tree;

pub use boosting::*;
pub use ensemble::*;
pub use forest::*;
pub use logistic::*;
pub use tree::*;

/// A fitted model producing `P(y = 1 | x)`.
pub trait ProbabilisticClassifier {
    /// Width of the rows the model was fitted on.
    fn n_features(&self) -> usize;

    /// Probability of the positive class for one standardized row.
    fn predict_positive(&self, row: &[f64]) -> f64;

    /// Probability of the positive class for every row.
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_positive(r)).collect()
    }

    /// Hard labels with the positive class winning ties at 0.5.
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<u8> {
        self.predict_proba(rows)
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect()
    }
}

/// The three base learners of the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
}

impl BaseModelKind {
    pub const ALL: [BaseModelKind; 3] = [
        BaseModelKind::LogisticRegression,
        BaseModelKind::RandomForest,
        BaseModelKind::GradientBoosting,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            BaseModelKind::LogisticRegression => "Logistic Regression",
            BaseModelKind::RandomForest => "Random Forest",
            BaseModelKind::GradientBoosting => "Gradient Boosting",
        }
    }
}

/// Hyperparameters for all base learners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub logistic: LogisticConfig,
    pub forest: ForestConfig,
    pub boosting: BoostingConfig,
}

/// Validate a training matrix and return its width.
///
/// Requires equal row/label counts, a consistent non-zero width, finite
/// values, binary labels, and both classes present.
pub(crate) fn check_training_input(rows: &[Vec<f64>], labels: &[u8]) -> Result<usize, AppError> {
    if rows.is_empty() {
        return Err(AppError::Training("no training rows".to_string()));
    }
    if rows.len() != labels.len() {
        return Err(AppError::Training(format!(
            "{} training rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }
    let width = rows[0].len();
    if width == 0 {
        return Err(AppError::Training("training rows have no features".to_string()));
    }
    if let Some(i) = rows.iter().position(|r| r.len() != width) {
        return Err(AppError::Training(format!("row {i} has {} features, expected {width}", rows[i].len())));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AppError::Training("training matrix contains non-finite values".to_string()));
    }
    if labels.iter().any(|&l| l > 1) {
        return Err(AppError::Training("labels must be 0 or 1".to_string()));
    }
    if !(labels.contains(&0) && labels.contains(&1)) {
        return Err(AppError::Training("both classes must be present in the training labels".to_string()));
    }
    Ok(width)
}
