//! CSV dataset ingest.
//!
//! Turns a headered, all-numeric CSV into a labeled `Dataset`:
//! - header names are trimmed and BOM-stripped
//! - the label column is resolved explicitly or by name heuristic
//! - empty feature cells are imputed with the column mean
//! - labels must be 0/1; anything else aborts the load

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DEFAULT_TARGET_COLUMN, Dataset, FeatureSchema, TARGET_KEYWORDS, class_counts};
use crate::error::AppError;

/// Minimum rows a training dataset must have.
pub const MIN_DATASET_ROWS: usize = 10;

/// A feature column that had missing cells filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    pub column: String,
    pub missing: usize,
    pub fill_value: f64,
}

/// Ingest output: the dataset plus what was done to it.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    /// True when the label column came from the name heuristic.
    pub target_inferred: bool,
    pub imputations: Vec<Imputation>,
}

/// Load a labeled dataset from `path`.
pub fn load_dataset(path: &Path, target_column: Option<&str>) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::Dataset(format!("failed to open dataset '{}': {e}", path.display())))?;
    read_dataset(file, target_column)
}

/// Parse a dataset from any CSV reader.
pub fn read_dataset<R: std::io::Read>(source: R, target_column: Option<&str>) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Dataset(format!("failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    if headers.len() < 2 {
        return Err(AppError::Dataset(
            "dataset needs at least one feature column and a label column".to_string(),
        ));
    }

    let (target_idx, target_inferred) = resolve_target(&headers, target_column)?;
    let feature_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != target_idx).collect();

    let mut cells: Vec<Vec<Option<f64>>> = Vec::new();
    let mut labels = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::Dataset(format!("line {line}: CSV parse error: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(AppError::Dataset(format!(
                "line {line}: expected {} columns, found {}",
                headers.len(),
                record.len()
            )));
        }

        labels.push(parse_label(&record, target_idx, &headers, line)?);
        let row = feature_idx
            .iter()
            .map(|&i| parse_cell(&record, i).map_err(|raw| {
                AppError::Dataset(format!("line {line}: column `{}` has non-numeric value `{raw}`", headers[i]))
            }))
            .collect::<Result<Vec<_>, _>>()?;
        cells.push(row);
    }

    if cells.len() < MIN_DATASET_ROWS {
        return Err(AppError::Dataset(format!(
            "dataset has {} rows, need at least {MIN_DATASET_ROWS}",
            cells.len()
        )));
    }
    let [neg, pos] = class_counts(&labels);
    if neg == 0 || pos == 0 {
        return Err(AppError::Dataset(format!(
            "label column `{}` contains a single class ({neg} negative, {pos} positive)",
            headers[target_idx]
        )));
    }

    let feature_names: Vec<String> = feature_idx.iter().map(|&i| headers[i].clone()).collect();
    let (rows, imputations) = impute_means(cells, &feature_names)?;
    let schema = FeatureSchema::new(feature_names, headers[target_idx].clone())?;

    Ok(IngestedData {
        dataset: Dataset { schema, rows, labels },
        target_inferred,
        imputations,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Index of the label column and whether it was inferred.
///
/// Without an explicit name, an exact `target` or `heart_risk` column wins,
/// then the first column whose lowercase name contains a target keyword,
/// then the last column.
pub fn resolve_target(headers: &[String], explicit: Option<&str>) -> Result<(usize, bool), AppError> {
    if let Some(name) = explicit {
        return headers
            .iter()
            .position(|h| h == name)
            .map(|i| (i, false))
            .ok_or_else(|| AppError::Dataset(format!("target column `{name}` not found in dataset")));
    }
    let exact_match = headers.iter().position(|h| {
        h.eq_ignore_ascii_case("target") || h.eq_ignore_ascii_case(DEFAULT_TARGET_COLUMN)
    });
    let keyword_match = exact_match.or_else(|| {
        headers.iter().position(|h| {
            let lower = h.to_ascii_lowercase();
            TARGET_KEYWORDS.iter().any(|k| lower.contains(k))
        })
    });
    match keyword_match {
        Some(i) => Ok((i, true)),
        None if !headers.is_empty() => Ok((headers.len() - 1, true)),
        None => Err(AppError::Dataset("dataset has no columns".to_string())),
    }
}

/// `Ok(None)` for an empty or NaN cell, `Err(raw)` for non-numeric text.
fn parse_cell(record: &StringRecord, idx: usize) -> Result<Option<f64>, String> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(raw.to_string()),
    }
}

fn parse_label(record: &StringRecord, idx: usize, headers: &[String], line: usize) -> Result<u8, AppError> {
    let raw = record.get(idx).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(0),
        Ok(v) if v == 1.0 => Ok(1),
        _ => Err(AppError::Dataset(format!(
            "line {line}: label column `{}` must be 0 or 1, found `{raw}`",
            headers[idx]
        ))),
    }
}

fn impute_means(
    cells: Vec<Vec<Option<f64>>>,
    names: &[String],
) -> Result<(Vec<Vec<f64>>, Vec<Imputation>), AppError> {
    let mut imputations = Vec::new();
    let mut fills = Vec::with_capacity(names.len());
    for (j, name) in names.iter().enumerate() {
        let present: Vec<f64> = cells.iter().filter_map(|r| r[j]).collect();
        let missing = cells.len() - present.len();
        if present.is_empty() {
            return Err(AppError::Dataset(format!("column `{name}` has no values")));
        }
        let fill_value = present.iter().sum::<f64>() / present.len() as f64;
        if missing > 0 {
            imputations.push(Imputation {
                column: name.clone(),
                missing,
                fill_value,
            });
        }
        fills.push(fill_value);
    }

    let rows = cells
        .into_iter()
        .map(|r| r.into_iter().zip(&fills).map(|(c, f)| c.unwrap_or(*f)).collect())
        .collect();
    Ok((rows, imputations))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn csv_with_rows(header: &str, rows: &[&str]) -> String {
        let mut out = header.to_string();
        for r in rows {
            out.push('\n');
            out.push_str(r);
        }
        out
    }

    fn ten_rows() -> Vec<&'static str> {
        vec![
            "40,180,0", "45,190,0", "50,200,0", "38,170,0", "42,185,0",
            "65,280,1", "70,300,1", "60,260,1", "68,290,1", "72,310,1",
        ]
    }

    #[test]
    fn heuristic_picks_keyword_column() {
        let text = csv_with_rows("\u{feff}age, chol ,target", &ten_rows());
        let data = read_dataset(text.as_bytes(), None).unwrap();
        assert_eq!(data.dataset.schema.feature_names, vec!["age", "chol"]);
        assert_eq!(data.dataset.schema.target_column, "target");
        assert!(data.target_inferred);
        assert_eq!(data.dataset.class_counts(), [5, 5]);
    }

    #[test]
    fn falls_back_to_last_column() {
        let headers: Vec<String> = ["a", "b", "label"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolve_target(&headers, None).unwrap(), (2, true));
        let headers: Vec<String> = ["HeartDisease", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolve_target(&headers, None).unwrap(), (0, true));
        let headers: Vec<String> = ["heart_rate", "Heart_Risk"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolve_target(&headers, None).unwrap(), (1, true));
    }

    #[test]
    fn explicit_target_must_exist() {
        let text = csv_with_rows("age,outcome,chol", &["1,0,2"]);
        let err = read_dataset(text.as_bytes(), Some("target")).unwrap_err();
        assert!(matches!(err, AppError::Dataset(_)));
    }

    #[test]
    fn empty_cells_are_mean_imputed() {
        let mut rows = ten_rows();
        rows[0] = ",180,0";
        let text = csv_with_rows("age,chol,target", &rows);
        let data = read_dataset(text.as_bytes(), None).unwrap();
        let expected = (45.0 + 50.0 + 38.0 + 42.0 + 65.0 + 70.0 + 60.0 + 68.0 + 72.0) / 9.0;
        assert!((data.dataset.rows[0][0] - expected).abs() < 1e-12);
        assert_eq!(data.imputations.len(), 1);
        assert_eq!(data.imputations[0].column, "age");
    }

    #[test]
    fn rejects_bad_cells_and_labels() {
        let mut rows = ten_rows();
        rows[3] = "abc,170,0";
        let text = csv_with_rows("age,chol,target", &rows);
        let err = read_dataset(text.as_bytes(), None).unwrap_err().to_string();
        assert!(err.contains("line 5"), "{err}");

        let mut rows = ten_rows();
        rows[0] = "40,180,2";
        let text = csv_with_rows("age,chol,target", &rows);
        assert!(matches!(read_dataset(text.as_bytes(), None), Err(AppError::Dataset(_))));
    }

    #[test]
    fn accepts_float_labels() {
        let rows: Vec<String> = ten_rows().iter().map(|r| format!("{r}.0")).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let text = csv_with_rows("age,chol,target", &refs);
        assert_eq!(read_dataset(text.as_bytes(), None).unwrap().dataset.labels[9], 1);
    }

    #[test]
    fn rejects_small_or_single_class_datasets() {
        let text = csv_with_rows("age,chol,target", &ten_rows()[..9]);
        assert!(read_dataset(text.as_bytes(), None).is_err());

        let rows: Vec<&str> = std::iter::repeat_n("40,180,0", 12).collect();
        let text = csv_with_rows("age,chol,target", &rows);
        assert!(read_dataset(text.as_bytes(), None).is_err());
    }
}
