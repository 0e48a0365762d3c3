//! Export training metrics and datasets.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::Dataset;
use crate::error::AppError;
use crate::report::TrainingReport;

/// File name of the metrics report inside the artifact directory.
pub const METRICS_FILE: &str = "metrics.json";

/// Write the training report as pretty JSON.
pub fn write_metrics_json(path: &Path, report: &TrainingReport) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|e| AppError::io(path, std::io::Error::other(e)))?;
    writer.flush().map_err(|e| AppError::io(path, e))
}

/// Write a dataset as CSV: feature columns in schema order, then the label.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let to_io = |e: csv::Error| AppError::io(path, std::io::Error::other(e));

    let mut header: Vec<&str> = dataset.schema.feature_names.iter().map(String::as_str).collect();
    header.push(&dataset.schema.target_column);
    writer.write_record(&header).map_err(to_io)?;

    for (row, label) in dataset.rows.iter().zip(&dataset.labels) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        writer.write_record(&record).map_err(to_io)?;
    }
    writer.flush().map_err(|e| AppError::io(path, e))
}
