//! PostgreSQL membership ledger

use super::{MembershipDiff, MembershipLedger};
use crate::error::Result;
use crate::population::EntityId;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::sync::Arc;

/// PostgreSQL ledger
///
/// Default table: `segment_contacts` with columns
/// (segment_id, entity_id, created_at) and primary key (segment_id, entity_id).
pub struct PostgresLedger {
    pool: Arc<PgPool>,
    table: String,
}

impl PostgresLedger {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            table: "segment_contacts".to_string(),
        }
    }

    /// Use a custom table with the same layout
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Create the ledger table if it does not exist
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                segment_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (segment_id, entity_id)
            )",
            self.table
        );
        sqlx::query(&sql).execute(&*self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MembershipLedger for PostgresLedger {
    async fn members(&self, segment_id: &str) -> Result<BTreeSet<EntityId>> {
        let sql = format!("SELECT entity_id FROM {} WHERE segment_id = $1", self.table);
        let rows = sqlx::query(&sql)
            .bind(segment_id)
            .fetch_all(&*self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(Into::into))
            .collect()
    }

    async fn apply_diff(&self, segment_id: &str, diff: &MembershipDiff) -> Result<()> {
        if diff.is_empty() {
            return Ok(());
        }

        let left: Vec<String> = diff.left.iter().cloned().collect();
        let joined: Vec<String> = diff.joined.iter().cloned().collect();

        let mut tx = self.pool.begin().await?;

        if !left.is_empty() {
            let sql = format!(
                "DELETE FROM {} WHERE segment_id = $1 AND entity_id = ANY($2)",
                self.table
            );
            sqlx::query(&sql)
                .bind(segment_id)
                .bind(&left)
                .execute(&mut *tx)
                .await?;
        }

        if !joined.is_empty() {
            let sql = format!(
                "INSERT INTO {} (segment_id, entity_id)
                 SELECT $1, UNNEST($2::text[])
                 ON CONFLICT (segment_id, entity_id) DO NOTHING",
                self.table
            );
            sqlx::query(&sql)
                .bind(segment_id)
                .bind(&joined)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            segment = segment_id,
            joined = joined.len(),
            left = left.len(),
            "Committed membership diff"
        );

        Ok(())
    }
}
