//! Command-line parsing for the heart-disease risk tool.
//!
//! Argument parsing stays separate from the pipeline and serving code. Flags
//! that mirror a setting are optional and override it when given.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cardio", version, about = "Heart disease risk ensemble: train, predict, inspect")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train the ensemble on a CSV dataset and write the artifact set.
    Train(TrainArgs),
    /// Predict for one patient (JSON object) or many (JSON array).
    ///
    /// Per-request failures are reported inside the JSON response and do not
    /// change the exit code.
    Predict(PredictArgs),
    /// Print display metadata for every trained feature as JSON.
    Features(ArtifactArgs),
    /// Report whether the artifact set loads.
    Health(ArtifactArgs),
    /// Write a synthetic patient cohort as CSV.
    Synth(SynthArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Dataset CSV (defaults to DATASET_PATH).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Label column (defaults to TARGET_COLUMN, then a name heuristic).
    #[arg(long, value_name = "COLUMN")]
    pub target: Option<String>,

    /// Artifact directory (defaults to ARTIFACT_DIR).
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    /// Seed for the split, SMOTE and tree ensembles (defaults to RANDOM_STATE).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out for evaluation (defaults to TEST_SIZE).
    #[arg(long)]
    pub test_size: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Request JSON file, or `-` for stdin.
    #[arg(long, value_name = "FILE", default_value = "-")]
    pub input: PathBuf,

    /// Artifact directory (defaults to ARTIFACT_DIR).
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    /// Attach per-feature contributions and print a bar chart to stderr.
    #[arg(long)]
    pub explain: bool,

    /// Bar chart width (columns).
    #[arg(long, default_value_t = 40)]
    pub width: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ArtifactArgs {
    /// Artifact directory (defaults to ARTIFACT_DIR).
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of patients.
    #[arg(long, default_value_t = 1000)]
    pub rows: usize,

    /// Fraction of diseased patients.
    #[arg(long, default_value_t = 0.3)]
    pub positive_rate: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
