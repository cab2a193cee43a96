//! Repository configuration types
//!
//! Selects where segment definitions live (file system, database, memory)
//! and opens the matching backend.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::file_system::FileSystemSegmentRepository;
use crate::memory::MemorySegmentRepository;
use crate::traits::WritableSegmentRepository;
use crate::RepositoryResult;

/// Repository source type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySource {
    /// YAML files under a base directory
    #[default]
    FileSystem,
    /// PostgreSQL tables (requires the `postgres` feature)
    Database,
    /// Process memory, lost on exit
    Memory,
}

/// Repository configuration
///
/// # Examples
///
/// ```rust
/// use roster_repository::RepositoryConfig;
///
/// let config = RepositoryConfig::file_system("segments");
/// assert!(config.validate().is_ok());
///
/// let config = RepositoryConfig::database("postgresql://localhost/roster");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub source: RepositorySource,

    /// Root directory (required for FileSystem source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Connection URL (required for Database source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl RepositoryConfig {
    pub fn file_system(path: impl Into<String>) -> Self {
        Self {
            source: RepositorySource::FileSystem,
            base_path: Some(path.into()),
            database_url: None,
        }
    }

    pub fn database(url: impl Into<String>) -> Self {
        Self {
            source: RepositorySource::Database,
            base_path: None,
            database_url: Some(url.into()),
        }
    }

    pub fn memory() -> Self {
        Self {
            source: RepositorySource::Memory,
            base_path: None,
            database_url: None,
        }
    }

    /// Returns an error if required fields are missing for the selected source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            RepositorySource::FileSystem if self.base_path.is_none() => {
                Err(ConfigError::MissingField {
                    source: "FileSystem".to_string(),
                    field: "base_path".to_string(),
                })
            }
            RepositorySource::Database if self.database_url.is_none() => {
                Err(ConfigError::MissingField {
                    source: "Database".to_string(),
                    field: "database_url".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Validate and open the configured backend
    ///
    /// File system roots are created when missing.
    pub async fn open(&self) -> RepositoryResult<Arc<dyn WritableSegmentRepository>> {
        self.validate()?;

        match self.source {
            RepositorySource::FileSystem => {
                let path = self.base_path.as_deref().unwrap_or_default();
                let repo = FileSystemSegmentRepository::create(path).await?;
                Ok(Arc::new(repo))
            }
            RepositorySource::Memory => Ok(Arc::new(MemorySegmentRepository::new())),
            #[cfg(feature = "postgres")]
            RepositorySource::Database => {
                let url = self.database_url.as_deref().unwrap_or_default();
                let pool = sqlx::PgPool::connect(url).await?;
                let repo = crate::postgres::PostgresSegmentRepository::new(pool);
                repo.ensure_tables().await?;
                Ok(Arc::new(repo))
            }
            #[cfg(not(feature = "postgres"))]
            RepositorySource::Database => Err(ConfigError::FeatureDisabled {
                source: "Database".to_string(),
                feature: "postgres".to_string(),
            }
            .into()),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required field is missing for the selected source
    MissingField { source: String, field: String },
    /// The source needs a cargo feature this build lacks
    FeatureDisabled { source: String, feature: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingField { source, field } => {
                write!(f, "{} source requires {} to be set", source, field)
            }
            ConfigError::FeatureDisabled { source, feature } => {
                write!(f, "{} source requires the '{}' feature", source, feature)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
