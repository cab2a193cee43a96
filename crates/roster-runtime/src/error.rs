//! Runtime error types

use roster_core::date::DateParseError;
use roster_core::{FilterType, Operator};
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A validated field has no backing column
    #[error("Field has no column mapping: {0}")]
    UnmappedField(String),

    /// Operator has no translation for the field type
    #[error("Operator '{operator}' is not supported for {field_type} fields")]
    UnsupportedOperator {
        operator: Operator,
        field_type: FilterType,
    },

    /// Date argument could not be resolved
    #[error(transparent)]
    InvalidDate(#[from] DateParseError),

    /// Malformed fixture or record data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Database query or transaction failed
    #[error("Database error: {0}")]
    Database(String),

    /// Newsletter, email or directory provider failed
    #[error("Provider error: {0}")]
    Provider(#[source] anyhow::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for RuntimeError {
    fn from(err: sqlx::Error) -> Self {
        RuntimeError::Database(err.to_string())
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
