//! Error types for catalog import and statistics.

use thiserror::Error;

/// Errors that can occur during import or statistics.
#[derive(Error, Debug)]
pub enum StatsError {
    /// No naming convention recognized the file name.
    #[error("no naming convention matches '{0}'")]
    NamingMismatch(String),

    /// A class count line could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The raster catalog could not be loaded or saved.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A raster could not be read.
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Chart rendering or PNG encoding failed.
    #[error("render error: {0}")]
    Render(String),
}

impl StatsError {
    /// Create a Read error.
    pub fn read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Catalog(err.to_string())
    }
}

/// Result type for import and statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;
