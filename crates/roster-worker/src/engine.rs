//! Backend wiring from configuration

use roster_runtime::{
    ContactDirectory, FileLedger, MembershipLedger, MemoryContactDirectory, MemoryLedger,
    MemoryPopulation, PopulationSource,
};
use roster_sdk::{SegmentEngine, SegmentEngineBuilder};
use std::sync::Arc;

use crate::config::{LedgerConfig, PopulationConfig, WorkerConfig};
use crate::error::WorkerError;

/// Build the segment engine described by `config`
pub async fn init_engine(config: &WorkerConfig) -> anyhow::Result<SegmentEngine> {
    let (population, directory) = init_population(&config.population).await?;
    let ledger = init_ledger(&config.ledger).await?;

    let engine = SegmentEngineBuilder::new()
        .with_config(config.sync.clone())
        .with_repository_config(config.repository.clone())
        .with_population(population)
        .with_directory(directory)
        .with_ledger(ledger)
        .build()
        .await?;

    Ok(engine)
}

async fn init_population(
    config: &PopulationConfig,
) -> Result<(Arc<dyn PopulationSource>, Arc<dyn ContactDirectory>), WorkerError> {
    match config {
        PopulationConfig::Fixture { path, contacts } => {
            let population = MemoryPopulation::from_json_file(path)
                .await
                .map_err(|e| WorkerError::Backend {
                    backend: "population fixture",
                    source: e.into(),
                })?;
            tracing::info!(
                path = %path.display(),
                records = population.len().await,
                "Loaded population fixture"
            );

            let directory = match contacts {
                Some(contacts) => {
                    let json = tokio::fs::read_to_string(contacts).await.map_err(|e| {
                        WorkerError::Backend {
                            backend: "contact fixture",
                            source: e.into(),
                        }
                    })?;
                    MemoryContactDirectory::from_json(&json).map_err(|e| WorkerError::Backend {
                        backend: "contact fixture",
                        source: e.into(),
                    })?
                }
                None => MemoryContactDirectory::new(),
            };

            Ok((Arc::new(population), Arc::new(directory)))
        }
        #[cfg(feature = "sqlx")]
        PopulationConfig::Database {
            url,
            table,
            id_column,
            email_column,
            firstname_column,
            lastname_column,
        } => {
            use roster_core::FilterEntity;
            use roster_runtime::{ColumnMap, PostgresContactDirectory, PostgresPopulation};

            let pool = connect(url, "population database").await?;
            let population = PostgresPopulation::new(
                pool.clone(),
                table.clone(),
                ColumnMap::quoted(FilterEntity::Contact.schema()),
            )
            .with_id_column(id_column.clone());
            let directory = PostgresContactDirectory::new(pool, table.clone())
                .with_id_column(id_column.clone())
                .with_columns(
                    email_column.clone(),
                    firstname_column.clone(),
                    lastname_column.clone(),
                );

            Ok((Arc::new(population), Arc::new(directory)))
        }
        #[cfg(not(feature = "sqlx"))]
        PopulationConfig::Database { .. } => Err(WorkerError::FeatureDisabled {
            backend: "database population",
            feature: "sqlx",
        }),
    }
}

async fn init_ledger(config: &LedgerConfig) -> Result<Arc<dyn MembershipLedger>, WorkerError> {
    match config {
        LedgerConfig::File { path } => {
            let ledger = FileLedger::create(path.clone())
                .await
                .map_err(|e| WorkerError::Backend {
                    backend: "ledger directory",
                    source: e.into(),
                })?;
            tracing::info!(path = %path.display(), "Using file ledger");
            Ok(Arc::new(ledger))
        }
        LedgerConfig::Memory => Ok(Arc::new(MemoryLedger::new())),
        #[cfg(feature = "sqlx")]
        LedgerConfig::Database { url } => {
            let pool = connect(url, "ledger database").await?;
            let ledger = roster_runtime::PostgresLedger::new(pool);
            ledger.ensure_table().await.map_err(|e| WorkerError::Backend {
                backend: "ledger database",
                source: e.into(),
            })?;
            Ok(Arc::new(ledger))
        }
        #[cfg(not(feature = "sqlx"))]
        LedgerConfig::Database { .. } => Err(WorkerError::FeatureDisabled {
            backend: "database ledger",
            feature: "sqlx",
        }),
    }
}

#[cfg(feature = "sqlx")]
async fn connect(url: &str, backend: &'static str) -> Result<Arc<sqlx::PgPool>, WorkerError> {
    sqlx::PgPool::connect(url)
        .await
        .map(Arc::new)
        .map_err(|e| WorkerError::Backend {
            backend,
            source: e.into(),
        })
}
