//! Error types for the reprojection pipeline.

use thiserror::Error;

/// Errors that can occur while processing one input file.
///
/// Each variant names the stage that failed so the batch summary can say
/// where a file went wrong.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The input could not be opened or does not hold the expected variable.
    #[error("unreadable input {path}: {message}")]
    UnreadableInput { path: String, message: String },

    /// No usable coordinate reference system.
    #[error("CRS error: {0}")]
    Crs(String),

    /// The grid could not be transformed to the target CRS.
    #[error("transform error: {0}")]
    Transform(String),

    /// The output could not be written.
    #[error("write error {path}: {message}")]
    Write { path: String, message: String },

    /// Invalid pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create an UnreadableInput error.
    pub fn unreadable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnreadableInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a Crs error.
    pub fn crs(msg: impl Into<String>) -> Self {
        Self::Crs(msg.into())
    }

    /// Create a Transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Create a Write error.
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short stage name for logs and summaries.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnreadableInput { .. } => "load",
            Self::Crs(_) => "crs",
            Self::Transform(_) => "reproject",
            Self::Write { .. } => "write",
            Self::Config(_) => "config",
        }
    }
}

impl From<projection::ProjectionError> for PipelineError {
    fn from(err: projection::ProjectionError) -> Self {
        match err {
            projection::ProjectionError::UnsupportedCrs(code) => {
                Self::Crs(format!("unsupported CRS {}", code))
            }
            other => Self::Transform(other.to_string()),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
