//! Per-feature explanations of ensemble predictions.
//!
//! For each feature `j`, the contribution is
//!
//! ```text
//! φ_j = f(x) - mean_b f(x with x_j := b_j)
//! ```
//!
//! over background rows `b`: how much the prediction drops, on average, when
//! that single feature is replaced by a typical value. Inputs are in the
//! standardized space the ensemble was fitted in.

pub mod chart;

pub use chart::*;

use serde::{Deserialize, Serialize};

use crate::domain::FeatureSchema;
use crate::error::AppError;
use crate::models::{ProbabilisticClassifier, VotingEnsemble};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    /// Positive values push toward the positive (diseased) class.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// `p_positive` for the explained record.
    pub prediction: f64,
    /// Mean `p_positive` over the background rows.
    pub base_value: f64,
    /// One entry per feature, in schema order.
    pub contributions: Vec<FeatureContribution>,
}

impl Explanation {
    /// Contributions sorted by descending magnitude (name breaks ties).
    pub fn ranked(&self) -> Vec<&FeatureContribution> {
        let mut out: Vec<&FeatureContribution> = self.contributions.iter().collect();
        out.sort_by(|a, b| {
            b.contribution
                .abs()
                .total_cmp(&a.contribution.abs())
                .then_with(|| a.feature.cmp(&b.feature))
        });
        out
    }
}

/// Attribute `ensemble`'s prediction for a standardized `record`.
pub fn explain(
    ensemble: &VotingEnsemble,
    background: &[Vec<f64>],
    schema: &FeatureSchema,
    record: &[f64],
) -> Result<Explanation, AppError> {
    let n = schema.len();
    if record.len() != n || ensemble.n_features() != n {
        return Err(AppError::SchemaMismatch(format!(
            "cannot explain a {}-value record with a {}-feature model and a {n}-feature schema",
            record.len(),
            ensemble.n_features()
        )));
    }
    if background.is_empty() {
        return Err(AppError::ArtifactLoad("model artifact has no explanation background".to_string()));
    }

    let prediction = ensemble.predict_positive(record);
    let base_value = ensemble.predict_proba(background).iter().sum::<f64>() / background.len() as f64;

    let mut perturbed = record.to_vec();
    let contributions = schema
        .feature_names
        .iter()
        .enumerate()
        .map(|(j, feature)| {
            let mut total = 0.0;
            for row in background {
                perturbed[j] = row[j];
                total += ensemble.predict_positive(&perturbed);
            }
            perturbed[j] = record[j];
            FeatureContribution {
                feature: feature.clone(),
                contribution: prediction - total / background.len() as f64,
            }
        })
        .collect();

    Ok(Explanation {
        prediction,
        base_value,
        contributions,
    })
}
