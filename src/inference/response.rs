//! Serializable response shapes for the inference service.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{FeatureKind, FeatureSpec, PredictionResult, RiskCategory};
use crate::explain::Explanation;

/// Class probabilities in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub healthy: f64,
    pub diseased: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictSuccess {
    pub success: bool,
    /// `"Positive"` or `"Negative"`.
    pub diagnosis: String,
    pub risk_percentage: f64,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub risk_category: RiskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictFailure {
    pub success: bool,
    pub error: String,
}

/// Per-request envelope: either a prediction or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Success(PredictSuccess),
    Failure(PredictFailure),
}

impl PredictResponse {
    pub fn success(result: &PredictionResult) -> Self {
        let p_pos = result.p_positive();
        let p_neg = result.class_probabilities[0];
        PredictResponse::Success(PredictSuccess {
            success: true,
            diagnosis: if result.predicted_label == 1 { "Positive" } else { "Negative" }.to_string(),
            risk_percentage: percent(p_pos),
            confidence: percent(result.confidence()),
            probabilities: Probabilities {
                healthy: percent(p_neg),
                diseased: percent(p_pos),
            },
            risk_category: result.risk_category,
            explanation: None,
        })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        PredictResponse::Failure(PredictFailure {
            success: false,
            error: error.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictResponse::Success(_))
    }

    /// Attach an explanation to a successful response.
    pub fn with_explanation(self, explanation: Explanation) -> Self {
        match self {
            PredictResponse::Success(mut s) => {
                s.explanation = Some(explanation);
                PredictResponse::Success(s)
            }
            failure => failure,
        }
    }
}

/// Probability to percent, rounded to 2 decimals.
fn percent(p: f64) -> f64 {
    (p * 10_000.0).round() / 100.0
}

/// Display hints for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureHint {
    pub label: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: f64,
}

impl From<&FeatureSpec> for FeatureHint {
    fn from(spec: &FeatureSpec) -> Self {
        Self {
            label: spec.label.clone(),
            unit: spec.unit.clone(),
            kind: spec.kind,
            min: spec.min,
            max: spec.max,
            step: spec.step,
        }
    }
}

/// Feature name -> hints, serialized as a JSON object in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub entries: Vec<(String, FeatureHint)>,
}

impl Serialize for FeatureInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, hint) in &self.entries {
            map.serialize_entry(name, hint)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub feature_count: usize,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    /// Status reported when the artifact set could not be loaded.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            status: "unavailable".to_string(),
            model_loaded: false,
            scaler_loaded: false,
            feature_count: 0,
            version: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn success_envelope_rounds_percentages() {
        let result = PredictionResult {
            predicted_label: 1,
            class_probabilities: [0.123456, 0.876544],
            risk_category: RiskCategory::High,
        };
        let value = serde_json::to_value(PredictResponse::success(&result)).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "diagnosis": "Positive",
                "risk_percentage": 87.65,
                "confidence": 87.65,
                "probabilities": {"healthy": 12.35, "diseased": 87.65},
                "risk_category": "High"
            })
        );
    }

    #[test]
    fn failure_envelope_carries_message() {
        let value = serde_json::to_value(PredictResponse::failure("missing features: age")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "missing features: age"}));
    }

    #[test]
    fn feature_info_keeps_insertion_order() {
        let hint = FeatureHint::from(&FeatureSpec::generic("z_score"));
        let info = FeatureInfo {
            entries: vec![("zeta".to_string(), hint.clone()), ("alpha".to_string(), hint)],
        };
        let text = serde_json::to_string(&info).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert!(text.contains(r#""type":"continuous""#));
    }
}
