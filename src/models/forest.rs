//! Random forest: bootstrap-bagged Gini trees with per-node feature sampling.
//!
//! Trees are grown in parallel with rayon. Each tree draws from its own
//! `StdRng` seeded from `(seed, tree index)`, so the fitted forest does not
//! depend on thread scheduling.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::tree::{Criterion, DecisionTree, TreeParams, grow_tree};
use crate::models::{ProbabilisticClassifier, check_training_input};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 15,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &ForestConfig) -> Result<Self, AppError> {
        let n_features = check_training_input(rows, labels)?;
        if config.n_estimators == 0 {
            return Err(AppError::Config("forest needs at least one tree".to_string()));
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features: Some(sqrt_features(n_features)),
        };
        let n = rows.len();

        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(config.seed, t));
                let mut indices: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                grow_tree(rows, &mut indices, Criterion::Gini { labels }, &params, &mut rng)
            })
            .collect();

        tracing::debug!(
            trees = trees.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            leaves = trees.iter().map(DecisionTree::n_leaves).sum::<usize>(),
            "random forest fitted"
        );

        Ok(Self { n_features, trees })
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the trees' leaf positive fractions.
    fn predict_positive(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}

/// `round(sqrt(n))`, at least 1.
fn sqrt_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt().round() as usize).max(1)
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
