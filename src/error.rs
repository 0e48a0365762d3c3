//! Crate-wide error type.
//!
//! Every variant carries a process exit code so the binary can report failures
//! the same way regardless of which stage raised them.

/// Errors raised while training, persisting, or serving the risk model.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid settings or CLI arguments.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset missing or malformed at load time.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Feature set of a request or of the loaded artifacts does not line up
    /// with the feature schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A persisted artifact is missing or corrupt.
    #[error("Artifact load error: {0}")]
    ArtifactLoad(String),

    /// Non-numeric or out-of-range feature value.
    #[error("Invalid value: {0}")]
    NumericValidation(String),

    /// Numerical failure while fitting a model.
    #[error("Training error: {0}")]
    Training(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::NumericValidation(_) => 2,
            AppError::Dataset(_) => 3,
            AppError::Training(_) | AppError::Io { .. } => 4,
            AppError::ArtifactLoad(_) | AppError::SchemaMismatch(_) => 5,
        }
    }

    /// True for failures scoped to a single prediction request.
    ///
    /// These are converted into a failure response instead of stopping the
    /// service.
    pub fn is_request_error(&self) -> bool {
        matches!(self, AppError::SchemaMismatch(_) | AppError::NumericValidation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_stage() {
        assert_eq!(AppError::Config("x".into()).exit_code(), 2);
        assert_eq!(AppError::Dataset("x".into()).exit_code(), 3);
        assert_eq!(AppError::Training("x".into()).exit_code(), 4);
        assert_eq!(AppError::ArtifactLoad("x".into()).exit_code(), 5);
    }

    #[test]
    fn request_errors_are_recoverable() {
        assert!(AppError::NumericValidation("age".into()).is_request_error());
        assert!(AppError::SchemaMismatch("missing".into()).is_request_error());
        assert!(!AppError::ArtifactLoad("gone".into()).is_request_error());
    }
}
