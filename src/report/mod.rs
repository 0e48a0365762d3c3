//! Evaluation metrics and the training report.
//!
//! Metrics are computed on the untouched test partition for the ensemble and
//! for each base learner, so the comparison table shows what voting adds.

pub mod format;

pub use format::*;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{BaseModelKind, ProbabilisticClassifier, VotingEnsemble};

/// Binary classification metrics at the 0.5 decision threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `None` when the evaluated labels contain a single class.
    pub auc_roc: Option<f64>,
    /// `[[TN, FP], [FN, TP]]`.
    pub confusion_matrix: [[usize; 2]; 2],
    pub support: usize,
}

/// Score labels against positive-class probabilities.
pub fn classification_metrics(labels: &[u8], p_positive: &[f64]) -> Result<ClassificationMetrics, AppError> {
    if labels.len() != p_positive.len() {
        return Err(AppError::Training(format!(
            "{} labels but {} predictions",
            labels.len(),
            p_positive.len()
        )));
    }
    if labels.is_empty() {
        return Err(AppError::Training("cannot evaluate on an empty partition".to_string()));
    }

    let mut cm = [[0usize; 2]; 2];
    for (&y, &p) in labels.iter().zip(p_positive) {
        let pred = usize::from(p >= 0.5);
        cm[usize::from(y)][pred] += 1;
    }
    let [[tn, fp], [fn_, tp]] = cm;

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        accuracy: ratio(tp + tn, labels.len()),
        precision,
        recall,
        f1_score,
        auc_roc: roc_auc(labels, p_positive),
        confusion_matrix: cm,
        support: labels.len(),
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// ROC-AUC as the Mann-Whitney U statistic, with tied scores sharing the
/// average rank.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || labels.len() != scores.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        rank_sum_pos += avg_rank * positives as f64;
        start = end;
    }

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Metrics for one named model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: String,
    pub metrics: ClassificationMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub ensemble: ClassificationMetrics,
    pub base_models: Vec<ModelScore>,
}

/// Evaluate the ensemble and every base learner on standardized test rows.
pub fn evaluate_ensemble(
    ensemble: &VotingEnsemble,
    rows: &[Vec<f64>],
    labels: &[u8],
) -> Result<EvaluationReport, AppError> {
    let ensemble_metrics = classification_metrics(labels, &ensemble.predict_proba(rows))?;
    let base_models = BaseModelKind::ALL
        .iter()
        .map(|&kind| {
            let probs = ensemble.base_model(kind).predict_proba(rows);
            Ok(ModelScore {
                model: kind.display_name().to_string(),
                metrics: classification_metrics(labels, &probs)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(EvaluationReport {
        ensemble: ensemble_metrics,
        base_models,
    })
}

/// Everything a training run reports (and writes to `metrics.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub version: String,
    pub dataset: String,
    pub target_column: String,
    pub target_inferred: bool,
    pub n_rows: usize,
    pub n_features: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// `[negatives, positives]` in the training partition before SMOTE.
    pub train_class_counts: [usize; 2],
    /// `[negatives, positives]` after SMOTE.
    pub resampled_class_counts: [usize; 2],
    pub evaluation: EvaluationReport,
}
