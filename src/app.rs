//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads settings (`.env` + environment)
//! - installs the tracing subscriber
//! - parses CLI arguments and dispatches to a handler
//!
//! stdout carries command output (reports, JSON); logs go to stderr.

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;

use crate::cli::{ArtifactArgs, Cli, Command, PredictArgs, SynthArgs, TrainArgs};
use crate::config::Settings;
use crate::domain::TrainConfig;
use crate::error::AppError;
use crate::explain::render_bar_chart;
use crate::inference::{HealthStatus, InferenceService, PredictResponse};

pub mod pipeline;

/// Entry point for the `cardio` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_tracing(&settings.log_level);

    match cli.command {
        Command::Train(args) => handle_train(&settings, args),
        Command::Predict(args) => handle_predict(&settings, args),
        Command::Features(args) => handle_features(&settings, args),
        Command::Health(args) => handle_health(&settings, args),
        Command::Synth(args) => handle_synth(args),
    }
}

/// `RUST_LOG` wins; otherwise the configured level.
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_train(settings: &Settings, args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(settings, &args)?;
    let paths = settings.artifact_paths(Some(config.artifact_dir.as_path()));
    let run = pipeline::run_training(&config, &paths)?;

    println!("{}", crate::report::format_training_summary(&run.report));
    println!("{}", crate::report::format_comparison_table(&run.report.evaluation));
    println!("Artifacts written to {}", config.artifact_dir.display());
    Ok(())
}

/// Settings first, then CLI flags.
pub fn train_config_from_args(settings: &Settings, args: &TrainArgs) -> Result<TrainConfig, AppError> {
    let mut config = settings.train_config();
    if let Some(path) = &args.data {
        config.dataset_path = path.clone();
    }
    if let Some(target) = &args.target {
        config.target_column = Some(target.clone());
    }
    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
        config.models.forest.seed = seed;
        config.models.boosting.seed = seed;
    }
    if let Some(test_size) = args.test_size {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Config(format!("--test-size must be in (0, 1), got {test_size}")));
        }
        config.test_size = test_size;
    }
    Ok(config)
}

fn load_service(settings: &Settings, dir: Option<&Path>) -> Result<InferenceService, AppError> {
    let paths = settings.artifact_paths(dir);
    InferenceService::load(&paths, &settings.catalog, settings.thresholds)
}

fn handle_predict(settings: &Settings, args: PredictArgs) -> Result<(), AppError> {
    let service = load_service(settings, args.artifacts.as_deref())?;
    let input = read_input(&args.input)?;

    let output = match serde_json::from_str::<Value>(&input) {
        Ok(Value::Array(items)) => {
            let responses: Vec<PredictResponse> =
                items.iter().map(|item| predict_value(&service, item, &args)).collect();
            to_json(&responses)?
        }
        Ok(item) => to_json(&predict_value(&service, &item, &args))?,
        Err(e) => to_json(&PredictResponse::failure(format!("invalid request JSON: {e}")))?,
    };
    println!("{output}");
    Ok(())
}

fn predict_value(service: &InferenceService, item: &Value, args: &PredictArgs) -> PredictResponse {
    let Value::Object(raw) = item else {
        return PredictResponse::failure("request must be a JSON object of feature values");
    };
    let response = service.respond(raw);
    if !(args.explain && response.is_success()) {
        return response;
    }
    match service.explain_one(raw) {
        Ok(explanation) => {
            if let PredictResponse::Success(s) = &response {
                eprintln!("{} ({:.2}% risk)", s.risk_category.display_name(), s.risk_percentage);
            }
            eprintln!("{}", render_bar_chart(&explanation, args.width));
            response.with_explanation(explanation)
        }
        Err(err) => {
            tracing::warn!(error = %err, "explanation unavailable");
            response
        }
    }
}

fn read_input(path: &Path) -> Result<String, AppError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::io(path, e))?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|e| AppError::io(path, e))
}

fn handle_features(settings: &Settings, args: ArtifactArgs) -> Result<(), AppError> {
    let service = load_service(settings, args.artifacts.as_deref())?;
    println!("{}", to_json(&service.feature_info())?);
    Ok(())
}

fn handle_health(settings: &Settings, args: ArtifactArgs) -> Result<(), AppError> {
    let status = match load_service(settings, args.artifacts.as_deref()) {
        Ok(service) => service.health(),
        Err(err) => {
            tracing::warn!(error = %err, "artifact set unavailable");
            HealthStatus::unavailable(err.to_string())
        }
    };
    println!("{}", to_json(&status)?);
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let cohort = crate::data::generate_cohort(args.rows, args.positive_rate, args.seed)?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
    }
    crate::io::write_dataset_csv(&args.out, &cohort)?;
    let [neg, pos] = cohort.class_counts();
    tracing::info!(rows = cohort.n_rows(), negative = neg, positive = pos, "synthetic cohort generated");
    println!("Wrote {} patients ({pos} positive) to {}", cohort.n_rows(), args.out.display());
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Training(format!("failed to serialize output: {e}")))
}
