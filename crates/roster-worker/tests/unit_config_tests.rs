//! Unit tests for WorkerConfig file loading

use roster_repository::{RepositoryConfig, RepositorySource};
use roster_worker::config::{LedgerConfig, LogFormat, PopulationConfig, WorkerConfig};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_load_toml() {
    let (_dir, path) = write_config(
        "worker.toml",
        r#"
run_once = true
log_level = "debug"
log_format = "json"

[repository]
source = "memory"

[population]
type = "fixture"
path = "data/members.json"
contacts = "data/contacts.json"

[sync]
concurrency = 8
"#,
    );

    let config = WorkerConfig::load_from(&path).unwrap();

    assert!(config.run_once);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.repository, RepositoryConfig::memory());
    assert_eq!(config.sync.concurrency, 8);
    assert_eq!(config.sync.interval_secs, 3600);
    assert_eq!(config.ledger, LedgerConfig::default());
    assert_eq!(
        config.population,
        PopulationConfig::Fixture {
            path: PathBuf::from("data/members.json"),
            contacts: Some(PathBuf::from("data/contacts.json")),
        }
    );
}

#[test]
fn test_load_yaml_database_backends() {
    let (_dir, path) = write_config(
        "worker.yaml",
        r#"
repository:
  source: database
  database_url: postgresql://localhost/roster
population:
  type: database
  url: postgresql://localhost/roster
ledger:
  type: database
  url: postgresql://localhost/roster
"#,
    );

    let config = WorkerConfig::load_from(&path).unwrap();

    assert_eq!(config.repository.source, RepositorySource::Database);
    match config.population {
        PopulationConfig::Database {
            table,
            id_column,
            email_column,
            firstname_column,
            lastname_column,
            ..
        } => {
            assert_eq!(table, "contacts");
            assert_eq!(id_column, "id");
            assert_eq!(email_column, "email");
            assert_eq!(firstname_column, "firstname");
            assert_eq!(lastname_column, "lastname");
        }
        other => panic!("Expected Database population, got {:?}", other),
    }
    assert!(matches!(config.ledger, LedgerConfig::Database { .. }));
}

#[test]
fn test_load_ledger_backends() {
    let (_dir, path) = write_config(
        "worker.toml",
        "[ledger]\ntype = \"file\"\npath = \"/var/lib/roster/ledger\"\n",
    );
    let config = WorkerConfig::load_from(&path).unwrap();
    assert_eq!(
        config.ledger,
        LedgerConfig::File {
            path: PathBuf::from("/var/lib/roster/ledger")
        }
    );

    let (_dir, path) = write_config("worker.toml", "[ledger]\ntype = \"memory\"\n");
    let error = WorkerConfig::load_from(&path).unwrap_err();
    assert!(error.to_string().contains("run_once"));

    let (_dir, path) = write_config(
        "worker.toml",
        "run_once = true\n\n[ledger]\ntype = \"memory\"\n",
    );
    let config = WorkerConfig::load_from(&path).unwrap();
    assert_eq!(config.ledger, LedgerConfig::Memory);
}

#[test]
fn test_empty_file_uses_defaults() {
    let (_dir, path) = write_config("worker.toml", "");

    let config = WorkerConfig::load_from(&path).unwrap();
    assert_eq!(config, WorkerConfig::default());
}

#[test]
fn test_invalid_sync_config_rejected() {
    let (_dir, path) = write_config("worker.toml", "[sync]\nconcurrency = 0\n");

    let error = WorkerConfig::load_from(&path).unwrap_err();
    assert!(error.to_string().contains("concurrency"));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(WorkerConfig::load_from(&dir.path().join("absent.toml")).is_err());
}
