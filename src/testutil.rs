//! Shared test fixtures.
//!
//! Training the full ensemble is the slowest thing the tests do, so one model
//! is trained on a seeded synthetic cohort and shared through `OnceLock`.

use std::path::PathBuf;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::app::pipeline::{TrainedModel, train};
use crate::data::generate_cohort;
use crate::domain::{FeatureCatalog, RiskThresholds, TrainConfig};
use crate::inference::InferenceService;
use crate::io::ArtifactSet;
use crate::models::ModelConfig;
use crate::preprocess::DEFAULT_SMOTE_K;

pub fn fixture_config() -> TrainConfig {
    TrainConfig {
        dataset_path: PathBuf::from("synthetic"),
        target_column: None,
        artifact_dir: PathBuf::from("unused"),
        seed: 42,
        test_size: 0.2,
        smote_k: DEFAULT_SMOTE_K,
        background_size: 100,
        models: ModelConfig::default(),
    }
}

pub fn trained_fixture() -> &'static TrainedModel {
    static FIXTURE: OnceLock<TrainedModel> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let cohort = generate_cohort(600, 0.3, 42).unwrap();
        train(&cohort, &fixture_config()).unwrap()
    })
}

pub fn trained_artifacts() -> &'static ArtifactSet {
    &trained_fixture().artifacts
}

pub fn trained_service() -> &'static InferenceService {
    static SERVICE: OnceLock<InferenceService> = OnceLock::new();
    SERVICE.get_or_init(|| {
        InferenceService::from_artifacts(
            trained_artifacts().clone(),
            &FeatureCatalog::clinical(),
            RiskThresholds::default(),
        )
        .unwrap()
    })
}

fn request(values: &[(&str, &str)]) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// Young, normotensive patient with no symptoms.
pub fn low_risk_request() -> Map<String, Value> {
    request(&[
        ("age", "35"),
        ("sex", "0"),
        ("cp", "0"),
        ("trestbps", "120"),
        ("chol", "180"),
        ("fbs", "0"),
        ("restecg", "0"),
        ("thalach", "160"),
        ("exang", "0"),
        ("oldpeak", "0.0"),
        ("slope", "1"),
        ("ca", "0"),
        ("thal", "0"),
        ("chest_pain_type", "0"),
        ("blood_pressure", "80"),
        ("cholesterol", "190"),
        ("heart_rate", "70"),
        ("st_depression", "0.0"),
    ])
}

/// Elderly patient with every symptom flag set.
pub fn high_risk_request() -> Map<String, Value> {
    request(&[
        ("age", "75"),
        ("sex", "1"),
        ("cp", "3"),
        ("trestbps", "160"),
        ("chol", "320"),
        ("fbs", "1"),
        ("restecg", "2"),
        ("thalach", "90"),
        ("exang", "1"),
        ("oldpeak", "5.0"),
        ("slope", "2"),
        ("ca", "3"),
        ("thal", "2"),
        ("chest_pain_type", "3"),
        ("blood_pressure", "110"),
        ("cholesterol", "340"),
        ("heart_rate", "85"),
        ("st_depression", "8.0"),
    ])
}

/// Middle-aged patient with a few borderline findings.
pub fn moderate_risk_request() -> Map<String, Value> {
    request(&[
        ("age", "55"),
        ("sex", "1"),
        ("cp", "1"),
        ("trestbps", "130"),
        ("chol", "240"),
        ("fbs", "0"),
        ("restecg", "1"),
        ("thalach", "150"),
        ("exang", "0"),
        ("oldpeak", "1.5"),
        ("slope", "1"),
        ("ca", "1"),
        ("thal", "2"),
        ("chest_pain_type", "1"),
        ("blood_pressure", "85"),
        ("cholesterol", "250"),
        ("heart_rate", "75"),
        ("st_depression", "0.5"),
    ])
}
