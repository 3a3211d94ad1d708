//! Error types for projection operations.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Point ({x}, {y}) is outside the projection domain")]
    OutOfDomain { x: f64, y: f64 },

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
