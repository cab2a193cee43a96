//! Worker error types

use roster_repository::ConfigError;
use roster_sdk::SdkError;
use thiserror::Error;

/// Errors raised while wiring the worker
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Synchronizer settings rejected
    #[error(transparent)]
    Sync(#[from] SdkError),

    /// Repository settings rejected
    #[error("Invalid repository configuration: {0}")]
    Repository(#[from] ConfigError),

    /// Configured backend needs a cargo feature this build lacks
    #[error("{backend} requires building with the '{feature}' feature")]
    FeatureDisabled {
        backend: &'static str,
        feature: &'static str,
    },

    /// Backend could not be opened
    #[error("Failed to open {backend}: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: anyhow::Error,
    },
}
