//! Error types for NetCDF operations.

use thiserror::Error;

/// Result type for NetCDF operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading and writing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File could not be opened as NetCDF
    #[error("Failed to open NetCDF file {path}: {message}")]
    Open { path: String, message: String },

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Failure while defining or writing a dataset
    #[error("Write failed: {0}")]
    Write(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
