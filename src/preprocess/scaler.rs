//! Per-feature standardization.
//!
//! `fit` learns the mean and the population standard deviation (ddof = 0) of
//! every column of the training partition. `transform` maps
//! `x -> (x - mean) / std` column by column, in schema order.
//!
//! Columns whose standard deviation is (numerically) zero get `std = 1`, so
//! they are only centred. This keeps `transform` total.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::{mean, population_std};

/// Standard deviations at or below this are treated as zero variance.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// Fitted standardization parameters, indexed by schema position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl ScalerState {
    /// Learn column means and standard deviations from training rows.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, AppError> {
        let Some(first) = rows.first() else {
            return Err(AppError::Training("cannot fit scaler on zero rows".to_string()));
        };
        let n_features = first.len();
        if n_features == 0 {
            return Err(AppError::Training("cannot fit scaler on zero features".to_string()));
        }
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(AppError::Training("ragged feature matrix".to_string()));
        }

        let mut means = Vec::with_capacity(n_features);
        let mut stds = Vec::with_capacity(n_features);
        let mut column = Vec::with_capacity(rows.len());
        for j in 0..n_features {
            column.clear();
            column.extend(rows.iter().map(|r| r[j]));
            let m = mean(&column).unwrap_or(0.0);
            let s = population_std(&column).unwrap_or(0.0);
            if !(m.is_finite() && s.is_finite()) {
                return Err(AppError::Training(format!("non-finite statistics for feature #{j}")));
            }
            means.push(m);
            stds.push(if s > ZERO_VARIANCE_EPS { s } else { 1.0 });
        }

        Ok(Self { mean: means, std: stds })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row; its width must match the fitted width.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, AppError> {
        if row.len() != self.n_features() {
            return Err(AppError::SchemaMismatch(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, AppError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    /// Internal consistency: equal lengths, finite means, positive stds.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.mean.len() != self.std.len() {
            return Err(AppError::SchemaMismatch(format!(
                "scaler has {} means but {} standard deviations",
                self.mean.len(),
                self.std.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) || self.std.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(AppError::ArtifactLoad(
                "scaler contains non-finite means or non-positive standard deviations".to_string(),
            ));
        }
        Ok(())
    }
}
