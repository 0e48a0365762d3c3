//! Read/write the servable artifact set.
//!
//! Three JSON files are written together and share a `version` stamp:
//! - model: the fitted `VotingEnsemble` plus explanation background rows
//! - scaler: the fitted `ScalerState`
//! - feature info: the `FeatureSchema`
//!
//! Saving writes every file to a `.tmp` sibling first and only renames once
//! all three are on disk. Loading rejects any set whose members disagree.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::FeatureSchema;
use crate::error::AppError;
use crate::models::VotingEnsemble;
use crate::preprocess::ScalerState;

/// Locations of the three artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub feature_info: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model: dir.join("heart_model.json"),
            scaler: dir.join("scaler.json"),
            feature_info: dir.join("feature_info.json"),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.model, &self.scaler, &self.feature_info]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub feature_count: usize,
    pub ensemble: VotingEnsemble,
    /// Standardized rows used as the explanation baseline.
    pub background: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub version: String,
    pub feature_count: usize,
    pub scaler: ScalerState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoArtifact {
    pub version: String,
    pub feature_count: usize,
    pub schema: FeatureSchema,
}

/// A consistent model/scaler/schema triple.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub model: ModelArtifact,
    pub scaler: ScalerArtifact,
    pub feature_info: FeatureInfoArtifact,
}

impl ArtifactSet {
    /// Stamp freshly trained components with one shared version.
    pub fn new(
        ensemble: VotingEnsemble,
        background: Vec<Vec<f64>>,
        scaler: ScalerState,
        schema: FeatureSchema,
    ) -> Result<Self, AppError> {
        let version = version_stamp();
        let feature_count = schema.len();
        let set = Self {
            model: ModelArtifact {
                version: version.clone(),
                feature_count,
                ensemble,
                background,
            },
            scaler: ScalerArtifact {
                version: version.clone(),
                feature_count,
                scaler,
            },
            feature_info: FeatureInfoArtifact {
                version,
                feature_count,
                schema,
            },
        };
        set.check_consistency()?;
        Ok(set)
    }

    pub fn version(&self) -> &str {
        &self.feature_info.version
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.feature_info.schema
    }

    /// Every member must carry the same version and agree on width, and
    /// each must be internally well formed.
    pub fn check_consistency(&self) -> Result<(), AppError> {
        let schema = &self.feature_info.schema;
        FeatureSchema::new(schema.feature_names.clone(), schema.target_column.as_str()).map_err(|e| match e {
            AppError::Dataset(msg) => AppError::ArtifactLoad(format!("invalid feature schema: {msg}")),
            other => other,
        })?;

        let version = &self.feature_info.version;
        if &self.model.version != version || &self.scaler.version != version {
            return Err(AppError::SchemaMismatch(format!(
                "artifact versions differ (model {}, scaler {}, feature info {version})",
                self.model.version, self.scaler.version
            )));
        }

        let n = self.feature_info.schema.len();
        let widths = [
            ("feature info count", self.feature_info.feature_count),
            ("model feature count", self.model.feature_count),
            ("model input width", self.model.ensemble.n_features),
            ("scaler feature count", self.scaler.feature_count),
            ("scaler width", self.scaler.scaler.n_features()),
        ];
        for (what, width) in widths {
            if width != n {
                return Err(AppError::SchemaMismatch(format!(
                    "{what} is {width} but the schema has {n} features"
                )));
            }
        }
        if let Some(row) = self.model.background.iter().find(|r| r.len() != n) {
            return Err(AppError::SchemaMismatch(format!(
                "background row has {} values but the schema has {n} features",
                row.len()
            )));
        }

        self.model.ensemble.validate()?;
        self.scaler.scaler.validate()
    }
}

/// UTC timestamp with nanoseconds, e.g. `20260101T120000.123456789Z`.
pub fn version_stamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%.9fZ").to_string()
}

/// Persist all three artifacts, replacing any previous set.
pub fn save_artifacts(paths: &ArtifactPaths, set: &ArtifactSet) -> Result<(), AppError> {
    set.check_consistency()?;
    for path in paths.all() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }
    }

    let staged = write_tmp(&paths.model, &set.model)
        .and_then(|()| write_tmp(&paths.scaler, &set.scaler))
        .and_then(|()| write_tmp(&paths.feature_info, &set.feature_info));
    if let Err(err) = staged {
        for path in paths.all() {
            let _ = fs::remove_file(tmp_path(path));
        }
        return Err(err);
    }

    for (i, path) in paths.all().into_iter().enumerate() {
        if let Err(e) = fs::rename(tmp_path(path), path) {
            for rest in &paths.all()[i..] {
                let _ = fs::remove_file(tmp_path(rest));
            }
            return Err(AppError::io(path, e));
        }
    }
    tracing::info!(version = set.version(), model = %paths.model.display(), "artifacts saved");
    Ok(())
}

/// Load and cross-check all three artifacts.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<ArtifactSet, AppError> {
    let set = ArtifactSet {
        model: read_json(&paths.model)?,
        scaler: read_json(&paths.scaler)?,
        feature_info: read_json(&paths.feature_info)?,
    };
    set.check_consistency()?;
    tracing::info!(
        version = set.version(),
        features = set.feature_info.feature_count,
        "artifacts loaded"
    );
    Ok(set)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_tmp<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(|e| AppError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| AppError::ArtifactLoad(format!("failed to serialize '{}': {e}", path.display())))?;
    writer.flush().map_err(|e| AppError::io(&tmp, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| AppError::io(&tmp, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::ArtifactLoad(format!("failed to open artifact '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::ArtifactLoad(format!("corrupt artifact '{}': {e}", path.display())))
}
