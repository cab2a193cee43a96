//! In-memory population
//!
//! Holds entity records in memory. Suitable for tests, demos and small
//! fixture-driven deployments; data is lost when the process restarts.

use super::{EntityId, PopulationSource};
use crate::error::{Result, RuntimeError};
use crate::query::{FieldValue, MemoryAdapter, QueryAdapter, Record};
use chrono::{DateTime, Utc};
use roster_core::ValidatedRuleGroup;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::RwLock;

/// In-memory population source
pub struct MemoryPopulation {
    /// Map of entity id -> record
    records: RwLock<BTreeMap<EntityId, Record>>,

    /// Fixed clock for relative dates (None = wall clock)
    now: Option<DateTime<Utc>>,
}

impl MemoryPopulation {
    /// Create an empty population
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            now: None,
        }
    }

    /// Resolve relative dates against a fixed instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Add a record while building the population
    pub fn with_record(mut self, id: impl Into<EntityId>, record: Record) -> Self {
        self.records.get_mut().insert(id.into(), record);
        self
    }

    /// Load records from a JSON array of objects, each carrying an `id`
    ///
    /// ```
    /// use roster_runtime::population::MemoryPopulation;
    ///
    /// let population = MemoryPopulation::from_json(
    ///     r#"[{ "id": "c1", "firstname": "Ada", "tags": ["vip"] }]"#,
    /// ).unwrap();
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Record> = serde_json::from_str(json)
            .map_err(|e| RuntimeError::InvalidData(format!("Invalid population JSON: {}", e)))?;

        let mut records = BTreeMap::new();
        for mut row in rows {
            let id = match row.remove("id") {
                Some(FieldValue::Text(id)) => id,
                Some(FieldValue::Number(n)) => n.to_string(),
                other => {
                    return Err(RuntimeError::InvalidData(format!(
                        "Population record without a string or number id: {:?}",
                        other
                    )))
                }
            };
            records.insert(id, row);
        }

        Ok(Self {
            records: RwLock::new(records),
            now: None,
        })
    }

    /// Load records from a JSON file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&content)
    }

    /// Insert or replace a record
    pub async fn insert(&self, id: impl Into<EntityId>, record: Record) {
        self.records.write().await.insert(id.into(), record);
    }

    /// Set one field of an existing record
    pub async fn set_field(&self, id: &str, field: &str, value: FieldValue) -> bool {
        match self.records.write().await.get_mut(id) {
            Some(record) => {
                record.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Remove a record
    pub async fn remove(&self, id: &str) -> Option<Record> {
        self.records.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryPopulation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PopulationSource for MemoryPopulation {
    async fn matching_ids(&self, group: &ValidatedRuleGroup) -> Result<BTreeSet<EntityId>> {
        let adapter = MemoryAdapter::new().with_now(self.now.unwrap_or_else(Utc::now));
        let predicate = adapter.translate(group)?;

        let records = self.records.read().await;
        let matched: BTreeSet<EntityId> = records
            .iter()
            .filter(|(_, record)| predicate(*record))
            .map(|(id, _)| id.clone())
            .collect();

        tracing::debug!(
            "Memory population matched {} of {} records",
            matched.len(),
            records.len()
        );

        Ok(matched)
    }
}
