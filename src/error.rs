// src/error.rs

use thiserror::Error;

/// Failures from the persistence and configuration boundary.
///
/// Problem selection and answer scoring never produce these.
#[derive(Debug, Error)]
pub enum FastMathError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("unknown orientation: {0}")]
    UnknownOrientation(String),
}

pub type Result<T> = std::result::Result<T, FastMathError>;
