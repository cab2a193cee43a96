//! Worker configuration

use roster_repository::RepositoryConfig;
use roster_sdk::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::WorkerError;

/// Where the contact population comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PopulationConfig {
    /// JSON fixture files
    Fixture {
        /// Array of contact records (default: "fixtures/population.json")
        #[serde(default = "default_population_path")]
        path: PathBuf,
        /// Array of contacts used to address emails
        #[serde(default)]
        contacts: Option<PathBuf>,
    },
    /// A PostgreSQL table (requires the `sqlx` feature)
    ///
    /// The same table addresses emails, so it must carry the contact columns.
    Database {
        url: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default = "default_id_column")]
        id_column: String,
        #[serde(default = "default_email_column")]
        email_column: String,
        #[serde(default = "default_firstname_column")]
        firstname_column: String,
        #[serde(default = "default_lastname_column")]
        lastname_column: String,
    },
}

fn default_population_path() -> PathBuf {
    PathBuf::from("fixtures/population.json")
}

fn default_table() -> String {
    "contacts".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_email_column() -> String {
    "email".to_string()
}

fn default_firstname_column() -> String {
    "firstname".to_string()
}

fn default_lastname_column() -> String {
    "lastname".to_string()
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig::Fixture {
            path: default_population_path(),
            contacts: None,
        }
    }
}

/// Where segment membership is checkpointed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerConfig {
    /// One membership file per segment under `path` (default: "ledger")
    File {
        #[serde(default = "default_ledger_path")]
        path: PathBuf,
    },
    /// Process memory; every start begins with empty segments, so only
    /// allowed together with `run_once`
    Memory,
    /// A PostgreSQL table (requires the `sqlx` feature)
    Database { url: String },
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("ledger")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::File {
            path: default_ledger_path(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub repository: RepositoryConfig,
    pub population: PopulationConfig,
    pub ledger: LedgerConfig,
    pub sync: SyncConfig,

    /// Sweep once and exit instead of running on an interval
    pub run_once: bool,

    /// Level for the roster crates when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig::file_system("segments"),
            population: PopulationConfig::default(),
            ledger: LedgerConfig::default(),
            sync: SyncConfig::default(),
            run_once: false,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from `.env`, `config/worker.*` and `ROSTER_*` variables
    ///
    /// Nested keys use a double underscore, e.g. `ROSTER_SYNC__CONCURRENCY=8`.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/worker").required(false))
            .add_source(
                config::Environment::with_prefix("ROSTER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build();

        match config_result {
            Ok(cfg) => Self::from_config(cfg),
            Err(e) => {
                tracing::info!(error = %e, "No usable configuration found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a single file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: config::Config) -> anyhow::Result<Self> {
        let config: Self = cfg
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        self.sync.validate()?;
        self.repository.validate()?;
        if self.ledger == LedgerConfig::Memory && !self.run_once {
            return Err(WorkerError::Config(
                "a memory ledger forgets membership on restart and re-fires every join; \
                 use a file or database ledger, or set run_once"
                    .to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(WorkerError::Config("log_level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Default `EnvFilter` directives for the roster crates
    pub fn default_filter(&self) -> String {
        ["roster_worker", "roster_sdk", "roster_runtime", "roster_repository"]
            .iter()
            .map(|target| format!("{}={}", target, self.log_level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();

        assert!(!config.run_once);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(
            config.ledger,
            LedgerConfig::File {
                path: PathBuf::from("ledger")
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_ledger_only_for_single_runs() {
        let mut config = WorkerConfig {
            ledger: LedgerConfig::Memory,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Config(_))));

        config.run_once = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_population_default() {
        if let PopulationConfig::Fixture { path, contacts } = PopulationConfig::default() {
            assert_eq!(path, PathBuf::from("fixtures/population.json"));
            assert!(contacts.is_none());
        } else {
            panic!("Expected Fixture population");
        }
    }

    #[test]
    fn test_default_filter() {
        let config = WorkerConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.default_filter(),
            "roster_worker=debug,roster_sdk=debug,roster_runtime=debug,roster_repository=debug"
        );
    }
}
