//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during training and serving
//! - persisted as part of the artifact set
//! - returned to callers of the inference service

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ModelConfig;

/// Label column used by the synthetic cohort and the default catalog.
pub const DEFAULT_TARGET_COLUMN: &str = "heart_risk";

/// Keywords used by the target-column heuristic (lowercase substring match).
pub const TARGET_KEYWORDS: [&str; 3] = ["target", "heart", "risk"];

/// How a feature is presented and what values it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Continuous,
    Binary,
    Categorical,
}

/// Display and validation metadata for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub kind: FeatureKind,
    /// Inclusive lower bound (none = unbounded).
    pub min: Option<f64>,
    /// Inclusive upper bound (none = unbounded).
    pub max: Option<f64>,
    pub step: f64,
}

impl FeatureSpec {
    fn new(name: &str, label: &str, unit: &str, kind: FeatureKind, min: f64, max: f64, step: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            kind,
            min: Some(min),
            max: Some(max),
            step,
        }
    }

    /// Spec for a trained feature that has no catalog entry.
    pub fn generic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: title_case(name),
            unit: String::new(),
            kind: FeatureKind::Continuous,
            min: None,
            max: None,
            step: 0.5,
        }
    }

    /// Reject non-finite values and values outside `[min, max]`.
    pub fn check(&self, value: f64) -> Result<(), AppError> {
        if !value.is_finite() {
            return Err(AppError::NumericValidation(format!(
                "`{}` must be a finite number",
                self.name
            )));
        }
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(AppError::NumericValidation(format!(
                "`{}` = {value} is outside the valid range [{}, {}]",
                self.name,
                fmt_bound(self.min),
                fmt_bound(self.max),
            )));
        }
        Ok(())
    }
}

fn fmt_bound(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Declarative per-feature metadata table.
///
/// Validation ranges and UI hints come from here; nothing in the core infers
/// them from feature names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCatalog {
    pub specs: Vec<FeatureSpec>,
}

impl FeatureCatalog {
    /// The 18-feature clinical catalog.
    pub fn clinical() -> Self {
        use FeatureKind::{Binary, Categorical, Continuous};
        let specs = vec![
            FeatureSpec::new("age", "Age", "years", Continuous, 18.0, 100.0, 1.0),
            FeatureSpec::new("sex", "Sex", "0 = female, 1 = male", Binary, 0.0, 1.0, 1.0),
            FeatureSpec::new("cp", "Chest Pain Score", "0-3", Categorical, 0.0, 3.0, 1.0),
            FeatureSpec::new("trestbps", "Resting Blood Pressure", "mmHg", Continuous, 80.0, 200.0, 1.0),
            FeatureSpec::new("chol", "Serum Cholesterol", "mg/dL", Continuous, 100.0, 400.0, 1.0),
            FeatureSpec::new("fbs", "Fasting Blood Sugar > 120", "0 = no, 1 = yes", Binary, 0.0, 1.0, 1.0),
            FeatureSpec::new("restecg", "Resting ECG", "0-2", Categorical, 0.0, 2.0, 1.0),
            FeatureSpec::new("thalach", "Max Heart Rate Achieved", "bpm", Continuous, 40.0, 220.0, 1.0),
            FeatureSpec::new("exang", "Exercise-Induced Angina", "0 = no, 1 = yes", Binary, 0.0, 1.0, 1.0),
            FeatureSpec::new("oldpeak", "Oldpeak", "mm", Continuous, 0.0, 10.0, 0.1),
            FeatureSpec::new("slope", "ST Slope", "0-2", Categorical, 0.0, 2.0, 1.0),
            FeatureSpec::new("ca", "Major Vessels", "0-4", Categorical, 0.0, 4.0, 1.0),
            FeatureSpec::new("thal", "Thalassemia", "0-3", Categorical, 0.0, 3.0, 1.0),
            FeatureSpec::new("chest_pain_type", "Chest Pain Type", "0-3", Categorical, 0.0, 3.0, 1.0),
            FeatureSpec::new("blood_pressure", "Blood Pressure", "mmHg", Continuous, 80.0, 200.0, 1.0),
            FeatureSpec::new("cholesterol", "Cholesterol", "mg/dL", Continuous, 100.0, 400.0, 1.0),
            FeatureSpec::new("heart_rate", "Heart Rate", "bpm", Continuous, 40.0, 220.0, 1.0),
            FeatureSpec::new("st_depression", "ST Depression", "mm", Continuous, 0.0, 10.0, 0.1),
        ];
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Catalog entry for `name`, or a generic unbounded spec.
    pub fn spec_for(&self, name: &str) -> FeatureSpec {
        self.get(name).cloned().unwrap_or_else(|| FeatureSpec::generic(name))
    }

    /// Override the valid range of every listed feature present in the catalog.
    pub fn set_range(&mut self, names: &[&str], min: f64, max: f64) {
        for spec in self.specs.iter_mut().filter(|s| names.contains(&s.name.as_str())) {
            spec.min = Some(min);
            spec.max = Some(max);
        }
    }

    #[cfg(test)]
    pub fn feature_names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }
}

/// Ordered feature names plus the label column, fixed at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub feature_names: Vec<String>,
    pub target_column: String,
}

impl FeatureSchema {
    pub fn new(feature_names: Vec<String>, target_column: impl Into<String>) -> Result<Self, AppError> {
        let target_column = target_column.into();
        if feature_names.is_empty() {
            return Err(AppError::Dataset("feature schema has no features".to_string()));
        }
        let mut seen = HashSet::new();
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(AppError::Dataset(format!("duplicate feature column `{name}`")));
            }
        }
        if seen.contains(target_column.as_str()) {
            return Err(AppError::Dataset(format!(
                "target column `{target_column}` is also listed as a feature"
            )));
        }
        Ok(Self {
            feature_names,
            target_column,
        })
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Reorder a record into schema order.
    ///
    /// The record's key set must equal the schema's feature set exactly.
    pub fn order(&self, record: &FeatureRecord) -> Result<Vec<f64>, AppError> {
        let missing: Vec<&str> = self
            .feature_names
            .iter()
            .filter(|n| !record.contains_key(n.as_str()))
            .map(String::as_str)
            .collect();
        let unexpected: Vec<&str> = record
            .keys()
            .filter(|k| !self.feature_names.contains(*k))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing features: {}", missing.join(", ")));
            }
            if !unexpected.is_empty() {
                parts.push(format!("unexpected features: {}", unexpected.join(", ")));
            }
            return Err(AppError::SchemaMismatch(parts.join("; ")));
        }

        Ok(self.feature_names.iter().map(|n| record[n.as_str()]).collect())
    }
}

/// Feature name -> numeric value for a single patient.
pub type FeatureRecord = BTreeMap<String, f64>;

/// A labeled tabular dataset (rows in feature order, binary labels).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// `[negatives, positives]`.
    pub fn class_counts(&self) -> [usize; 2] {
        class_counts(&self.labels)
    }

    pub fn select(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<u8>) {
        let rows = indices.iter().map(|&i| self.rows[i].clone()).collect();
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (rows, labels)
    }
}

/// `[negatives, positives]` for a binary label vector.
pub fn class_counts(labels: &[u8]) -> [usize; 2] {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    [labels.len() - positives, positives]
}

/// Disjoint row indices of the train and test partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Coarse bucketing of the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub fn display_name(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Moderate => "Moderate Risk",
            RiskCategory::High => "High Risk",
        }
    }
}

/// Probability cut points for `RiskCategory`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// `p < low` is low risk.
    pub low: f64,
    /// `low <= p < high` is moderate; `p >= high` is high risk.
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { low: 0.3, high: 0.7 }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), AppError> {
        let in_unit = |v: f64| v.is_finite() && v > 0.0 && v < 1.0;
        if !(in_unit(self.low) && in_unit(self.high) && self.low < self.high) {
            return Err(AppError::Config(format!(
                "risk thresholds must satisfy 0 < low < high < 1 (got low={}, high={})",
                self.low, self.high
            )));
        }
        Ok(())
    }

    pub fn categorize(&self, p_positive: f64) -> RiskCategory {
        if p_positive < self.low {
            RiskCategory::Low
        } else if p_positive < self.high {
            RiskCategory::Moderate
        } else {
            RiskCategory::High
        }
    }
}

/// Outcome of a single inference call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub predicted_label: u8,
    /// `[p_negative, p_positive]`.
    pub class_probabilities: [f64; 2],
    pub risk_category: RiskCategory,
}

impl PredictionResult {
    pub fn p_positive(&self) -> f64 {
        self.class_probabilities[1]
    }

    pub fn confidence(&self) -> f64 {
        self.class_probabilities[0].max(self.class_probabilities[1])
    }
}

/// A full training run's configuration as understood by the pipeline.
///
/// This is derived from settings plus CLI flags.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub dataset_path: PathBuf,
    /// Explicit label column; `None` falls back to the name heuristic.
    pub target_column: Option<String>,
    pub artifact_dir: PathBuf,
    pub seed: u64,
    pub test_size: f64,
    /// Neighbour count for synthetic oversampling.
    pub smote_k: usize,
    /// Rows of resampled training data kept as explanation background.
    pub background_size: usize,
    pub models: ModelConfig,
}
