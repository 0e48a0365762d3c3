//! Environment-driven settings.
//!
//! `Settings::from_env()` loads a `.env` file if present (dotenvy) and then
//! reads process variables. Every variable is optional; CLI flags are applied
//! on top by the caller.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::{FeatureCatalog, RiskThresholds, TrainConfig};
use crate::error::AppError;
use crate::io::ArtifactPaths;
use crate::models::ModelConfig;
use crate::preprocess::DEFAULT_SMOTE_K;

/// Variable names that move each catalog feature's valid range.
const RANGE_OVERRIDES: [(&str, &str, &[&str]); 4] = [
    ("MIN_AGE", "MAX_AGE", &["age"]),
    ("MIN_BP", "MAX_BP", &["trestbps", "blood_pressure"]),
    ("MIN_CHOLESTEROL", "MAX_CHOLESTEROL", &["chol", "cholesterol"]),
    ("MIN_HEART_RATE", "MAX_HEART_RATE", &["thalach", "heart_rate"]),
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub dataset_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub feature_info_file: String,
    pub target_column: Option<String>,
    pub random_state: u64,
    pub test_size: f64,
    /// Validation ranges and display metadata served with predictions.
    pub catalog: FeatureCatalog,
    pub thresholds: RiskThresholds,
    pub background_size: usize,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("heart.csv"),
            artifact_dir: PathBuf::from("artifacts"),
            model_file: "heart_model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            feature_info_file: "feature_info.json".to_string(),
            target_column: None,
            random_state: 42,
            test_size: 0.2,
            catalog: FeatureCatalog::clinical(),
            thresholds: RiskThresholds::default(),
            background_size: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `.env` and the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut s = Settings::default();

        if let Some(v) = get("DATASET_PATH") {
            s.dataset_path = PathBuf::from(v);
        }
        if let Some(v) = get("ARTIFACT_DIR") {
            s.artifact_dir = PathBuf::from(v);
        }
        if let Some(v) = get("MODEL_PATH") {
            s.model_file = v;
        }
        if let Some(v) = get("SCALER_PATH") {
            s.scaler_file = v;
        }
        if let Some(v) = get("FEATURE_INFO_PATH") {
            s.feature_info_file = v;
        }
        s.target_column = get("TARGET_COLUMN");
        if let Some(v) = get("LOG_LEVEL") {
            s.log_level = v;
        }

        s.random_state = parse_or("RANDOM_STATE", get("RANDOM_STATE"), s.random_state)?;
        s.test_size = parse_or("TEST_SIZE", get("TEST_SIZE"), s.test_size)?;
        s.background_size = parse_or("SHAP_BACKGROUND_SIZE", get("SHAP_BACKGROUND_SIZE"), s.background_size)?;
        s.thresholds = RiskThresholds {
            low: parse_or("RISK_LOW", get("RISK_LOW"), s.thresholds.low)?,
            high: parse_or("RISK_HIGH", get("RISK_HIGH"), s.thresholds.high)?,
        };

        for (min_key, max_key, features) in RANGE_OVERRIDES {
            let (min_get, max_get) = (get(min_key), get(max_key));
            if min_get.is_none() && max_get.is_none() {
                continue;
            }
            let Some(current) = s.catalog.get(features[0]) else {
                continue;
            };
            let min = parse_or(min_key, min_get, current.min.unwrap_or(f64::NEG_INFINITY))?;
            let max = parse_or(max_key, max_get, current.max.unwrap_or(f64::INFINITY))?;
            if !(min < max) {
                return Err(AppError::Config(format!(
                    "{min_key} ({min}) must be below {max_key} ({max})"
                )));
            }
            s.catalog.set_range(features, min, max);
        }

        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AppError::Config(format!(
                "TEST_SIZE must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.background_size == 0 {
            return Err(AppError::Config("SHAP_BACKGROUND_SIZE must be at least 1".to_string()));
        }
        self.thresholds.validate()
    }

    /// Artifact file locations, optionally under a different directory.
    pub fn artifact_paths(&self, dir_override: Option<&Path>) -> ArtifactPaths {
        let dir = dir_override.unwrap_or(self.artifact_dir.as_path());
        ArtifactPaths {
            model: dir.join(&self.model_file),
            scaler: dir.join(&self.scaler_file),
            feature_info: dir.join(&self.feature_info_file),
        }
    }

    /// Pipeline configuration with default model hyperparameters.
    pub fn train_config(&self) -> TrainConfig {
        let mut models = ModelConfig::default();
        models.forest.seed = self.random_state;
        models.boosting.seed = self.random_state;
        TrainConfig {
            dataset_path: self.dataset_path.clone(),
            target_column: self.target_column.clone(),
            artifact_dir: self.artifact_dir.clone(),
            seed: self.random_state,
            test_size: self.test_size,
            smote_k: DEFAULT_SMOTE_K,
            background_size: self.background_size,
            models,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value `{v}`"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, AppError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.random_state, 42);
        assert_eq!(s.test_size, 0.2);
        assert_eq!(s.thresholds, RiskThresholds::default());
        assert_eq!(s.catalog, FeatureCatalog::clinical());
        let paths = s.artifact_paths(None);
        assert_eq!(paths.model, PathBuf::from("artifacts/heart_model.json"));
    }

    #[test]
    fn range_overrides_apply_to_paired_features() {
        let s = settings(&[("MIN_BP", "90"), ("MAX_CHOLESTEROL", "500")]).unwrap();
        for name in ["trestbps", "blood_pressure"] {
            let spec = s.catalog.get(name).unwrap();
            assert_eq!((spec.min, spec.max), (Some(90.0), Some(200.0)));
        }
        assert_eq!(s.catalog.get("cholesterol").unwrap().max, Some(500.0));
        assert_eq!(s.catalog.get("chol").unwrap().max, Some(500.0));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for vars in [
            &[("TEST_SIZE", "abc")][..],
            &[("TEST_SIZE", "1.5")],
            &[("MIN_AGE", "90"), ("MAX_AGE", "20")],
            &[("RISK_LOW", "0.8"), ("RISK_HIGH", "0.7")],
            &[("RANDOM_STATE", "-1")],
        ] {
            assert!(matches!(settings(vars), Err(AppError::Config(_))), "{vars:?}");
        }
    }

    #[test]
    fn train_config_carries_seed_into_models() {
        let s = settings(&[("RANDOM_STATE", "7"), ("TARGET_COLUMN", "target")]).unwrap();
        let cfg = s.train_config();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.models.forest.seed, 7);
        assert_eq!(cfg.target_column.as_deref(), Some("target"));
    }
}
