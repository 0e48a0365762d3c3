//! L2-regularized logistic regression fitted by Newton's method (IRLS).
//!
//! Objective (intercept unpenalized):
//!
//! ```text
//! minimize  Σ log(1 + exp(-s_i · (w·x_i + b)))  +  ||w||² / (2C)
//! ```
//!
//! Each iteration solves `H δ = g` for the full parameter vector `[b, w]`
//! and takes the step with backtracking on the objective, so every accepted
//! step decreases the loss.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::{sigmoid, solve_spd};
use crate::models::{ProbabilisticClassifier, check_training_input};

/// Maximum number of step halvings per Newton iteration.
const MAX_BACKTRACK: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Convergence threshold on the largest parameter update.
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Newton iterations used during fitting.
    pub iterations: usize,
}

impl LogisticRegression {
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &LogisticConfig) -> Result<Self, AppError> {
        let d = check_training_input(rows, labels)?;
        if !(config.c.is_finite() && config.c > 0.0) {
            return Err(AppError::Config(format!("logistic C must be > 0, got {}", config.c)));
        }
        let n = rows.len();
        let lambda = 1.0 / config.c;

        // Design matrix with a leading intercept column.
        let x = DMatrix::from_fn(n, d + 1, |i, j| if j == 0 { 1.0 } else { rows[i][j - 1] });
        let y = DVector::from_iterator(n, labels.iter().map(|&l| f64::from(l)));

        let mut beta = DVector::<f64>::zeros(d + 1);
        let mut loss = objective(&x, &y, &beta, lambda);
        let mut iterations = 0;

        for _ in 0..config.max_iter {
            iterations += 1;
            let z = &x * &beta;
            let p = z.map(sigmoid);

            let mut grad = x.transpose() * (&p - &y);
            let mut hess = weighted_gram(&x, &p);
            for j in 1..=d {
                grad[j] += lambda * beta[j];
                hess[(j, j)] += lambda;
            }

            let Some(step) = solve_spd(&hess, &grad) else {
                return Err(AppError::Training(
                    "logistic regression Newton system is singular".to_string(),
                ));
            };

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACK {
                let candidate = &beta - &step * scale;
                let candidate_loss = objective(&x, &y, &candidate, lambda);
                if candidate_loss <= loss {
                    accepted = Some((candidate, candidate_loss));
                    break;
                }
                scale *= 0.5;
            }
            let Some((next, next_loss)) = accepted else {
                break;
            };

            let max_update = (&next - &beta).amax();
            beta = next;
            loss = next_loss;
            if max_update < config.tol {
                break;
            }
        }

        if beta.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Training("logistic regression diverged".to_string()));
        }

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            iterations,
        })
    }

    /// Log-odds of the positive class.
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_positive(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}

/// `Xᵀ diag(p(1-p)) X`.
fn weighted_gram(x: &DMatrix<f64>, p: &DVector<f64>) -> DMatrix<f64> {
    let mut xw = x.clone();
    for (i, mut row) in xw.row_iter_mut().enumerate() {
        let w = (p[i] * (1.0 - p[i])).max(1e-12);
        row *= w;
    }
    x.transpose() * xw
}

fn objective(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>, lambda: f64) -> f64 {
    let z = x * beta;
    let data_loss: f64 = z
        .iter()
        .zip(y.iter())
        .map(|(&z, &y)| {
            // log(1 + e^z) - y z, computed without overflow.
            let softplus = if z > 0.0 { z + (-z).exp().ln_1p() } else { z.exp().ln_1p() };
            softplus - y * z
        })
        .sum();
    let penalty: f64 = beta.iter().skip(1).map(|b| b * b).sum::<f64>() * lambda / 2.0;
    data_loss + penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{accuracy, blobs};

    #[test]
    fn separates_gaussian_blobs() {
        let (rows, labels) = blobs(150, 3, 3.0, 11);
        let model = LogisticRegression::fit(&rows, &labels, &LogisticConfig::default()).unwrap();
        assert!(accuracy(&model.predict(&rows), &labels) > 0.9);
        assert!(model.coefficients.iter().all(|w| *w > 0.0));
    }

    #[test]
    fn regularization_keeps_separable_fit_finite() {
        let rows = vec![vec![-2.0], vec![-1.0], vec![1.0], vec![2.0]];
        let labels = vec![0, 0, 1, 1];
        let model = LogisticRegression::fit(&rows, &labels, &LogisticConfig::default()).unwrap();
        assert!(model.coefficients[0].is_finite());
        assert!(model.predict_positive(&[2.0]) > 0.5);
        assert!(model.predict_positive(&[-2.0]) < 0.5);
    }

    #[test]
    fn rejects_non_positive_c() {
        let rows = vec![vec![0.0], vec![1.0]];
        let config = LogisticConfig { c: 0.0, ..LogisticConfig::default() };
        assert!(LogisticRegression::fit(&rows, &[0, 1], &config).is_err());
    }
}
