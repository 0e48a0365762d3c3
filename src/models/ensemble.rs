//! Soft-voting ensemble over the three base learners.
//!
//! `predict_proba` is the unweighted mean of the base models' class-probability
//! vectors; `predict` returns 1 when `p_positive >= 0.5`, so the positive
//! class wins exact ties.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{
    BaseModelKind, GradientBoosting, LogisticRegression, ModelConfig, ProbabilisticClassifier, RandomForest,
    check_training_input,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingEnsemble {
    pub n_features: usize,
    pub logistic: LogisticRegression,
    pub forest: RandomForest,
    pub boosting: GradientBoosting,
}

impl VotingEnsemble {
    /// Fit all three base learners on the same rows.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &ModelConfig) -> Result<Self, AppError> {
        let n_features = check_training_input(rows, labels)?;

        tracing::info!(kind = BaseModelKind::LogisticRegression.display_name(), "fitting base model");
        let logistic = LogisticRegression::fit(rows, labels, &config.logistic)?;
        tracing::debug!(iterations = logistic.iterations, "logistic regression converged");

        tracing::info!(kind = BaseModelKind::RandomForest.display_name(), "fitting base model");
        let forest = RandomForest::fit(rows, labels, &config.forest)?;

        tracing::info!(kind = BaseModelKind::GradientBoosting.display_name(), "fitting base model");
        let boosting = GradientBoosting::fit(rows, labels, &config.boosting)?;

        Ok(Self {
            n_features,
            logistic,
            forest,
            boosting,
        })
    }

    pub fn base_model(&self, kind: BaseModelKind) -> &dyn ProbabilisticClassifier {
        match kind {
            BaseModelKind::LogisticRegression => &self.logistic,
            BaseModelKind::RandomForest => &self.forest,
            BaseModelKind::GradientBoosting => &self.boosting,
        }
    }

    /// `[p_negative, p_positive]` averaged over the base learners.
    pub fn predict_proba_row(&self, row: &[f64]) -> [f64; 2] {
        let votes: Vec<f64> = BaseModelKind::ALL
            .iter()
            .map(|&k| self.base_model(k).predict_positive(row))
            .collect();
        let m = votes.len() as f64;
        let p_negative = votes.iter().map(|p| 1.0 - p).sum::<f64>() / m;
        let p_positive = votes.iter().sum::<f64>() / m;
        [p_negative, p_positive]
    }

    pub fn predict_row(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba_row(row)[1] >= 0.5)
    }

    /// Every base learner must agree with the ensemble's input width, and
    /// every tree must be walkable for rows of that width.
    pub fn validate(&self) -> Result<(), AppError> {
        for kind in BaseModelKind::ALL {
            let width = self.base_model(kind).n_features();
            if width != self.n_features {
                return Err(AppError::SchemaMismatch(format!(
                    "{} expects {width} features but the ensemble expects {}",
                    kind.display_name(),
                    self.n_features
                )));
            }
        }

        let logistic_params = std::iter::once(&self.logistic.intercept).chain(&self.logistic.coefficients);
        let boosting_params = [self.boosting.base_margin, self.boosting.learning_rate];
        if logistic_params.chain(&boosting_params).any(|v| !v.is_finite()) {
            return Err(AppError::ArtifactLoad("model parameters are not finite".to_string()));
        }

        let tree_sets = [
            (BaseModelKind::RandomForest, &self.forest.trees),
            (BaseModelKind::GradientBoosting, &self.boosting.trees),
        ];
        for (kind, trees) in tree_sets {
            for (i, tree) in trees.iter().enumerate() {
                tree.validate(self.n_features).map_err(|e| match e {
                    AppError::ArtifactLoad(msg) => {
                        AppError::ArtifactLoad(format!("{} tree {i}: {msg}", kind.display_name()))
                    }
                    other => other,
                })?;
            }
        }
        Ok(())
    }
}

impl ProbabilisticClassifier for VotingEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_positive(&self, row: &[f64]) -> f64 {
        self.predict_proba_row(row)[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{accuracy, blobs};
    use crate::models::{BoostingConfig, ForestConfig, LogisticConfig};

    fn small_config() -> ModelConfig {
        ModelConfig {
            logistic: LogisticConfig::default(),
            forest: ForestConfig {
                n_estimators: 15,
                max_depth: 5,
                ..ForestConfig::default()
            },
            boosting: BoostingConfig {
                n_estimators: 20,
                max_depth: 3,
                ..BoostingConfig::default()
            },
        }
    }

    fn fitted() -> (VotingEnsemble, Vec<Vec<f64>>, Vec<u8>) {
        let (rows, labels) = blobs(100, 3, 3.0, 17);
        let model = VotingEnsemble::fit(&rows, &labels, &small_config()).unwrap();
        (model, rows, labels)
    }

    #[test]
    fn probabilities_are_mean_of_base_models() {
        let (model, rows, _) = fitted();
        let row = &rows[3];
        let expected = (model.logistic.predict_positive(row)
            + model.forest.predict_positive(row)
            + model.boosting.predict_positive(row))
            / 3.0;
        let [p_neg, p_pos] = model.predict_proba_row(row);
        assert!((p_pos - expected).abs() < 1e-12);
        assert!((p_neg + p_pos - 1.0).abs() < 1e-6);
    }

    #[test]
    fn probabilities_sum_to_one_everywhere() {
        let (model, _, _) = fitted();
        for x in [-10.0, -1.0, 0.0, 0.3, 4.0, 25.0] {
            let [a, b] = model.predict_proba_row(&[x, -x, x / 2.0]);
            assert!((a + b - 1.0).abs() < 1e-6, "x={x}: {a} + {b}");
        }
    }

    #[test]
    fn ensemble_classifies_blobs() {
        let (model, rows, labels) = fitted();
        assert!(accuracy(&model.predict(&rows), &labels) > 0.9);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn exact_tie_goes_to_positive_class() {
        let model = VotingEnsemble {
            n_features: 1,
            logistic: LogisticRegression {
                intercept: 0.0,
                coefficients: vec![0.0],
                iterations: 0,
            },
            forest: RandomForest {
                n_features: 1,
                trees: Vec::new(),
            },
            boosting: GradientBoosting {
                n_features: 1,
                base_margin: 0.0,
                learning_rate: 0.1,
                trees: Vec::new(),
            },
        };
        assert_eq!(model.predict_proba_row(&[1.0]), [0.5, 0.5]);
        assert_eq!(model.predict_row(&[1.0]), 1);
    }

    #[test]
    fn validate_walks_every_tree() {
        let (mut model, _, _) = fitted();
        model.boosting.trees[3].nodes.clear();
        assert!(matches!(model.validate(), Err(AppError::ArtifactLoad(_))));

        let (mut model, _, _) = fitted();
        model.logistic.intercept = f64::NAN;
        assert!(matches!(model.validate(), Err(AppError::ArtifactLoad(_))));
    }

    #[test]
    fn validate_detects_width_mismatch() {
        let (mut model, _, _) = fitted();
        model.logistic.coefficients.push(0.0);
        assert!(matches!(model.validate(), Err(AppError::SchemaMismatch(_))));
    }
}
