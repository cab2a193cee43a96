//! SDK error types

use roster_core::FilterError;
use roster_repository::RepositoryError;
use roster_runtime::RuntimeError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule group failed validation against the composed schema
    #[error(transparent)]
    InvalidRules(#[from] FilterError),

    /// Query, ledger or provider failure
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Segment storage failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Callout form lookup failed
    #[error("Callout form source error: {0}")]
    CalloutSource(String),
}

impl SdkError {
    /// Whether this is a rule validation failure a caller can fix
    pub fn is_invalid_rules(&self) -> bool {
        matches!(self, SdkError::InvalidRules(_))
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
