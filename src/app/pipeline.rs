//! Shared training pipeline.
//!
//! Strictly sequential and fail-fast:
//! LoadData -> IdentifyTarget -> SplitStratified -> FitScaler -> ResampleTrain
//! -> FitBaseModels/FitEnsemble -> Evaluate -> Persist
//!
//! Nothing is written until every earlier step has succeeded, so a failed
//! run leaves any previous artifact set untouched.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::domain::{Dataset, TrainConfig, class_counts};
use crate::error::AppError;
use crate::io::{ArtifactPaths, ArtifactSet, METRICS_FILE, load_dataset, save_artifacts, write_metrics_json};
use crate::models::VotingEnsemble;
use crate::preprocess::{ScalerState, smote_resample, stratified_split};
use crate::report::{EvaluationReport, TrainingReport, evaluate_ensemble};

/// Fitted artifacts plus what the fit saw, before anything is persisted.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub artifacts: ArtifactSet,
    pub evaluation: EvaluationReport,
    pub n_train: usize,
    pub n_test: usize,
    pub train_class_counts: [usize; 2],
    pub resampled_class_counts: [usize; 2],
}

/// All outputs of a single `cardio train` run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub artifacts: ArtifactSet,
    pub report: TrainingReport,
}

/// Execute the full pipeline from a CSV dataset and persist the result.
pub fn run_training(config: &TrainConfig, paths: &ArtifactPaths) -> Result<TrainingRun, AppError> {
    // 1) Load data and identify the target column.
    let ingest = load_dataset(&config.dataset_path, config.target_column.as_deref())?;
    let dataset = &ingest.dataset;
    tracing::info!(
        path = %config.dataset_path.display(),
        rows = dataset.n_rows(),
        features = dataset.schema.len(),
        "dataset loaded"
    );
    tracing::info!(
        target = %dataset.schema.target_column,
        inferred = ingest.target_inferred,
        "target column identified"
    );
    for imputation in &ingest.imputations {
        tracing::warn!(
            column = %imputation.column,
            missing = imputation.missing,
            fill = imputation.fill_value,
            "imputed missing values with column mean"
        );
    }

    // 2) Fit everything in memory.
    let trained = train(dataset, config)?;

    // 3) Persist the artifact set, then the informational metrics report.
    save_artifacts(paths, &trained.artifacts)?;
    let report = TrainingReport {
        version: trained.artifacts.version().to_string(),
        dataset: config.dataset_path.display().to_string(),
        target_column: dataset.schema.target_column.clone(),
        target_inferred: ingest.target_inferred,
        n_rows: dataset.n_rows(),
        n_features: dataset.schema.len(),
        n_train: trained.n_train,
        n_test: trained.n_test,
        train_class_counts: trained.train_class_counts,
        resampled_class_counts: trained.resampled_class_counts,
        evaluation: trained.evaluation,
    };
    write_metrics_json(&metrics_path(paths), &report)?;

    Ok(TrainingRun {
        artifacts: trained.artifacts,
        report,
    })
}

/// Split, scale, resample, fit and evaluate without touching the filesystem.
pub fn train(dataset: &Dataset, config: &TrainConfig) -> Result<TrainedModel, AppError> {
    // Split before any fitting so the test rows never influence the scaler.
    let split = stratified_split(&dataset.labels, config.test_size, config.seed)?;
    let (train_rows, train_labels) = dataset.select(&split.train);
    let (test_rows, test_labels) = dataset.select(&split.test);
    tracing::info!(train = train_rows.len(), test = test_rows.len(), "stratified split");

    let scaler = ScalerState::fit(&train_rows)?;
    let train_scaled = scaler.transform(&train_rows)?;
    let test_scaled = scaler.transform(&test_rows)?;

    // Oversample the training partition only.
    let train_class_counts = class_counts(&train_labels);
    let (resampled_rows, resampled_labels) =
        smote_resample(&train_scaled, &train_labels, config.smote_k, config.seed)?;
    let resampled_class_counts = class_counts(&resampled_labels);
    tracing::info!(
        before = ?train_class_counts,
        after = ?resampled_class_counts,
        "class balance after SMOTE"
    );

    let ensemble = VotingEnsemble::fit(&resampled_rows, &resampled_labels, &config.models)?;

    let evaluation = evaluate_ensemble(&ensemble, &test_scaled, &test_labels)?;
    for score in &evaluation.base_models {
        tracing::info!(
            model = %score.model,
            accuracy = score.metrics.accuracy,
            f1 = score.metrics.f1_score,
            "base model evaluated"
        );
    }
    tracing::info!(
        accuracy = evaluation.ensemble.accuracy,
        auc = ?evaluation.ensemble.auc_roc,
        "ensemble evaluated"
    );

    let background = background_sample(&train_scaled, config.background_size, config.seed);
    let artifacts = ArtifactSet::new(ensemble, background, scaler, dataset.schema.clone())?;

    Ok(TrainedModel {
        artifacts,
        evaluation,
        n_train: train_rows.len(),
        n_test: test_rows.len(),
        train_class_counts,
        resampled_class_counts,
    })
}

/// Seeded draw of up to `size` distinct rows, independent of file order.
fn background_sample(rows: &[Vec<f64>], size: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample(&mut rng, rows.len(), size.min(rows.len()))
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}

/// `metrics.json` next to the model artifact.
pub fn metrics_path(paths: &ArtifactPaths) -> std::path::PathBuf {
    paths.model.parent().unwrap_or(Path::new(".")).join(METRICS_FILE)
}
