//! Inference service.
//!
//! An `InferenceService` is built once from a loaded artifact set and then
//! only read, so a single instance can be shared (`&` or `Arc`) across
//! concurrent requests. Each request goes through:
//!
//! 1. key check against the trained schema
//! 2. numeric coercion (JSON numbers or numeric strings)
//! 3. range validation against the feature catalog
//! 4. standardization with the trained scaler
//! 5. soft-voting prediction and risk bucketing

pub mod response;

pub use response::*;

use serde_json::{Map, Value};

use crate::domain::{FeatureCatalog, FeatureRecord, FeatureSpec, PredictionResult, RiskThresholds};
use crate::error::AppError;
use crate::explain::{Explanation, explain};
use crate::io::{ArtifactPaths, ArtifactSet, load_artifacts};

#[derive(Debug, Clone)]
pub struct InferenceService {
    artifacts: ArtifactSet,
    /// Validation spec per schema feature, in schema order.
    specs: Vec<FeatureSpec>,
    thresholds: RiskThresholds,
}

impl InferenceService {
    /// Load the artifact set from disk. Any failure is fatal for serving.
    pub fn load(
        paths: &ArtifactPaths,
        catalog: &FeatureCatalog,
        thresholds: RiskThresholds,
    ) -> Result<Self, AppError> {
        Self::from_artifacts(load_artifacts(paths)?, catalog, thresholds)
    }

    pub fn from_artifacts(
        artifacts: ArtifactSet,
        catalog: &FeatureCatalog,
        thresholds: RiskThresholds,
    ) -> Result<Self, AppError> {
        artifacts.check_consistency()?;
        thresholds.validate()?;
        let specs = artifacts
            .schema()
            .feature_names
            .iter()
            .map(|name| catalog.spec_for(name))
            .collect();
        Ok(Self {
            artifacts,
            specs,
            thresholds,
        })
    }

    /// Predict from a raw JSON object of feature values.
    pub fn predict_one(&self, raw: &Map<String, Value>) -> Result<PredictionResult, AppError> {
        let record = self.coerce(raw)?;
        self.predict_record(&record)
    }

    /// Predict from an already-numeric record.
    pub fn predict_record(&self, record: &FeatureRecord) -> Result<PredictionResult, AppError> {
        let scaled = self.standardize(record)?;
        let class_probabilities = self.artifacts.model.ensemble.predict_proba_row(&scaled);
        let p_positive = class_probabilities[1];
        Ok(PredictionResult {
            predicted_label: u8::from(p_positive >= 0.5),
            class_probabilities,
            risk_category: self.thresholds.categorize(p_positive),
        })
    }

    /// `predict_one` wrapped in the success/failure envelope.
    ///
    /// Request-level errors become a failure response; nothing here panics
    /// or poisons the service for later requests.
    pub fn respond(&self, raw: &Map<String, Value>) -> PredictResponse {
        match self.predict_one(raw) {
            Ok(result) => PredictResponse::success(&result),
            Err(err) => {
                if err.is_request_error() {
                    tracing::warn!(error = %err, "prediction request rejected");
                } else {
                    tracing::error!(error = %err, "prediction failed");
                }
                PredictResponse::failure(err.to_string())
            }
        }
    }

    /// Feature attributions for one raw request.
    pub fn explain_one(&self, raw: &Map<String, Value>) -> Result<Explanation, AppError> {
        let record = self.coerce(raw)?;
        let scaled = self.standardize(&record)?;
        explain(
            &self.artifacts.model.ensemble,
            &self.artifacts.model.background,
            self.artifacts.schema(),
            &scaled,
        )
    }

    /// Display metadata for every trained feature, in schema order.
    pub fn feature_info(&self) -> FeatureInfo {
        FeatureInfo {
            entries: self
                .specs
                .iter()
                .map(|spec| (spec.name.clone(), FeatureHint::from(spec)))
                .collect(),
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            model_loaded: true,
            scaler_loaded: true,
            feature_count: self.artifacts.schema().len(),
            version: Some(self.artifacts.version().to_string()),
            error: None,
        }
    }

    /// Check keys, then coerce and range-check every value.
    fn coerce(&self, raw: &Map<String, Value>) -> Result<FeatureRecord, AppError> {
        let keys: FeatureRecord = raw.keys().map(|k| (k.clone(), 0.0)).collect();
        self.artifacts.schema().order(&keys)?;

        let mut record = FeatureRecord::new();
        for spec in &self.specs {
            let value = coerce_value(&spec.name, raw.get(spec.name.as_str()).unwrap_or(&Value::Null))?;
            spec.check(value)?;
            record.insert(spec.name.clone(), value);
        }
        Ok(record)
    }

    fn standardize(&self, record: &FeatureRecord) -> Result<Vec<f64>, AppError> {
        let ordered = self.artifacts.schema().order(record)?;
        for (spec, value) in self.specs.iter().zip(&ordered) {
            spec.check(*value)?;
        }
        self.artifacts.scaler.scaler.transform_row(&ordered)
    }
}

/// Accept JSON numbers and trimmed numeric strings.
fn coerce_value(name: &str, value: &Value) -> Result<f64, AppError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::NumericValidation(format!(
            "`{name}` must be a finite number, got {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::RiskCategory;
    use crate::io::save_artifacts;
    use crate::testutil::{
        high_risk_request, low_risk_request, moderate_risk_request, trained_artifacts, trained_service,
    };

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn low_risk_patient_is_negative() {
        let service = trained_service();
        let result = service.predict_one(&low_risk_request()).unwrap();
        assert_eq!(result.predicted_label, 0);
        assert_eq!(result.risk_category, RiskCategory::Low);
        match service.respond(&low_risk_request()) {
            PredictResponse::Success(s) => {
                assert_eq!(s.diagnosis, "Negative");
                assert!(s.risk_percentage < 30.0, "risk {}", s.risk_percentage);
            }
            PredictResponse::Failure(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[test]
    fn high_risk_patient_is_positive() {
        let service = trained_service();
        match service.respond(&high_risk_request()) {
            PredictResponse::Success(s) => {
                assert_eq!(s.diagnosis, "Positive");
                assert!(s.risk_percentage > 70.0, "risk {}", s.risk_percentage);
                assert_eq!(s.risk_category, RiskCategory::High);
                assert!((s.probabilities.healthy + s.probabilities.diseased - 100.0).abs() < 0.011);
            }
            PredictResponse::Failure(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[test]
    fn moderate_risk_patient_gets_a_complete_envelope() {
        match trained_service().respond(&moderate_risk_request()) {
            PredictResponse::Success(s) => {
                assert!((0.0..=100.0).contains(&s.risk_percentage));
                assert!((s.probabilities.healthy + s.probabilities.diseased - 100.0).abs() < 0.011);
                assert!(["Positive", "Negative"].contains(&s.diagnosis.as_str()));
            }
            PredictResponse::Failure(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[test]
    fn corrupt_tree_artifact_fails_at_load() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        save_artifacts(&paths, trained_artifacts()).unwrap();
        let mut set = trained_artifacts().clone();
        set.model.ensemble.forest.trees[0].nodes.clear();
        std::fs::write(&paths.model, serde_json::to_vec(&set.model).unwrap()).unwrap();

        let loaded = InferenceService::load(&paths, &FeatureCatalog::clinical(), RiskThresholds::default());
        assert!(matches!(loaded, Err(AppError::ArtifactLoad(_))));
    }

    #[test]
    fn out_of_range_age_is_a_validation_failure() {
        let mut request = low_risk_request();
        request.insert("age".to_string(), json!(150));
        let err = trained_service().predict_one(&request).unwrap_err();
        assert!(matches!(err, AppError::NumericValidation(_)));
        assert!(!trained_service().respond(&request).is_success());
    }

    #[test]
    fn missing_feature_is_a_structured_failure() {
        let mut request = high_risk_request();
        request.remove("cholesterol");
        let err = trained_service().predict_one(&request).unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(ref m) if m.contains("cholesterol")));

        let value = serde_json::to_value(trained_service().respond(&request)).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value["error"].as_str().unwrap().contains("missing features: cholesterol"));
    }

    #[test]
    fn unexpected_feature_is_rejected() {
        let mut request = low_risk_request();
        request.insert("smoker".to_string(), json!(1));
        let err = trained_service().predict_one(&request).unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(ref m) if m.contains("unexpected features: smoker")));
    }

    #[test]
    fn numbers_and_numeric_strings_agree() {
        let as_strings = low_risk_request();
        let as_numbers: Map<String, Value> = as_strings
            .iter()
            .map(|(k, v)| {
                let n: f64 = v.as_str().unwrap().parse().unwrap();
                (k.clone(), json!(n))
            })
            .collect();
        let service = trained_service();
        assert_eq!(
            service.predict_one(&as_strings).unwrap(),
            service.predict_one(&as_numbers).unwrap()
        );

        let mut bad = low_risk_request();
        bad.insert("age".to_string(), json!("forty"));
        assert!(matches!(service.predict_one(&bad), Err(AppError::NumericValidation(_))));
        bad.insert("age".to_string(), json!(null));
        assert!(matches!(service.predict_one(&bad), Err(AppError::NumericValidation(_))));
    }

    #[test]
    fn prediction_is_deterministic_across_loads() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        save_artifacts(&paths, trained_artifacts()).unwrap();

        let catalog = FeatureCatalog::clinical();
        let a = InferenceService::load(&paths, &catalog, RiskThresholds::default()).unwrap();
        let b = InferenceService::load(&paths, &catalog, RiskThresholds::default()).unwrap();
        let request = high_risk_request();
        assert_eq!(a.predict_one(&request).unwrap(), b.predict_one(&request).unwrap());
        assert_eq!(a.predict_one(&request).unwrap(), trained_service().predict_one(&request).unwrap());
    }

    #[test]
    fn concurrent_requests_share_one_service() {
        let service = trained_service();
        let expected = service.predict_one(&high_risk_request()).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| service.predict_one(&high_risk_request()).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn explanation_blames_risk_factors() {
        let explanation = trained_service().explain_one(&high_risk_request()).unwrap();
        assert_eq!(explanation.contributions.len(), 18);
        let total: f64 = explanation.contributions.iter().map(|c| c.contribution).sum();
        assert!(total > 0.0);
        assert!(explanation.prediction > explanation.base_value);
    }

    #[test]
    fn feature_info_and_health_describe_the_schema() {
        let service = trained_service();
        let info = serde_json::to_value(service.feature_info()).unwrap();
        assert_eq!(info["age"]["min"], json!(18.0));
        assert_eq!(info["sex"]["type"], json!("binary"));
        let first = as_map(info).keys().next().cloned();
        assert_eq!(first.as_deref(), Some("age"));

        let health = service.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.feature_count, 18);
        assert_eq!(health.version.as_deref(), Some(trained_artifacts().version()));
    }

    #[test]
    fn tighter_catalog_ranges_apply_at_request_time() {
        let mut catalog = FeatureCatalog::clinical();
        catalog.set_range(&["age"], 18.0, 30.0);
        let service =
            InferenceService::from_artifacts(trained_artifacts().clone(), &catalog, RiskThresholds::default())
                .unwrap();
        assert!(matches!(
            service.predict_one(&low_risk_request()),
            Err(AppError::NumericValidation(_))
        ));
    }
}
