//! Terminal formatting for training runs.
//!
//! Formatting lives here so the pipeline and metric code stay free of
//! presentation details.

use crate::report::{ClassificationMetrics, EvaluationReport, TrainingReport};

/// Dataset, resampling and ensemble summary for a finished training run.
pub fn format_training_summary(report: &TrainingReport) -> String {
    let mut out = String::new();

    out.push_str("=== cardio - Heart Disease Risk Ensemble ===\n");
    out.push_str(&format!("Dataset: {}\n", report.dataset));
    out.push_str(&format!(
        "Target: {}{}\n",
        report.target_column,
        if report.target_inferred { " (inferred from column names)" } else { "" }
    ));
    out.push_str(&format!(
        "Rows: n={} | features={} | train={} | test={}\n",
        report.n_rows, report.n_features, report.n_train, report.n_test
    ));
    out.push_str(&format!(
        "Train classes: {} negative / {} positive -> after SMOTE {} / {}\n",
        report.train_class_counts[0],
        report.train_class_counts[1],
        report.resampled_class_counts[0],
        report.resampled_class_counts[1],
    ));

    let m = &report.evaluation.ensemble;
    out.push_str("\nEnsemble (soft voting) on test partition:\n");
    out.push_str(&format!("- accuracy : {:.4}\n", m.accuracy));
    out.push_str(&format!("- precision: {:.4}\n", m.precision));
    out.push_str(&format!("- recall   : {:.4}\n", m.recall));
    out.push_str(&format!("- f1       : {:.4}\n", m.f1_score));
    out.push_str(&format!("- roc auc  : {}\n", fmt_auc(m.auc_roc)));
    out.push_str(&format_confusion_matrix(m));
    out.push_str(&format!("\nArtifacts version: {}\n", report.version));

    out
}

/// Side-by-side metrics for the base learners and the ensemble.
pub fn format_comparison_table(evaluation: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<22} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
        "model", "accuracy", "precision", "recall", "f1", "auc"
    ));
    out.push_str(&format!(
        "{:-<22} {:-<9} {:-<9} {:-<9} {:-<9} {:-<9}\n",
        "", "", "", "", "", ""
    ));

    let rows = evaluation
        .base_models
        .iter()
        .map(|s| (s.model.as_str(), &s.metrics))
        .chain(std::iter::once(("Voting Ensemble", &evaluation.ensemble)));
    for (name, m) in rows {
        out.push_str(&format!(
            "{:<22} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9}\n",
            name,
            m.accuracy,
            m.precision,
            m.recall,
            m.f1_score,
            fmt_auc(m.auc_roc)
        ));
    }
    out
}

fn format_confusion_matrix(m: &ClassificationMetrics) -> String {
    let [[tn, fp], [fn_, tp]] = m.confusion_matrix;
    let mut out = String::new();
    out.push_str("  confusion matrix (rows = actual, cols = predicted):\n");
    out.push_str(&format!("  {:>10} {:>8} {:>8}\n", "", "neg", "pos"));
    out.push_str(&format!("  {:>10} {:>8} {:>8}\n", "neg", tn, fp));
    out.push_str(&format!("  {:>10} {:>8} {:>8}\n", "pos", fn_, tp));
    out
}

fn fmt_auc(auc: Option<f64>) -> String {
    auc.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ModelScore, classification_metrics};

    fn evaluation() -> EvaluationReport {
        let m = classification_metrics(&[0, 0, 1, 1], &[0.2, 0.7, 0.8, 0.9]).unwrap();
        EvaluationReport {
            ensemble: m.clone(),
            base_models: vec![ModelScore {
                model: "Logistic Regression".to_string(),
                metrics: m,
            }],
        }
    }

    #[test]
    fn comparison_table_lists_every_model() {
        let table = format_comparison_table(&evaluation());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("Logistic Regression"));
        assert!(lines[3].starts_with("Voting Ensemble"));
        assert!(lines[3].contains("0.7500"));
    }

    #[test]
    fn summary_includes_confusion_matrix() {
        let report = TrainingReport {
            version: "v1".to_string(),
            dataset: "heart.csv".to_string(),
            target_column: "target".to_string(),
            target_inferred: true,
            n_rows: 4,
            n_features: 2,
            n_train: 2,
            n_test: 2,
            train_class_counts: [1, 1],
            resampled_class_counts: [1, 1],
            evaluation: evaluation(),
        };
        let text = format_training_summary(&report);
        assert!(text.contains("Target: target (inferred from column names)"));
        assert!(text.contains("confusion matrix"));
        assert!(text.contains("Artifacts version: v1"));
    }
}
