//! PostgreSQL population

use super::{EntityId, PopulationSource};
use crate::error::Result;
use crate::query::{ColumnMap, SqlAdapter, SqlParam};
use chrono::Utc;
use roster_core::ValidatedRuleGroup;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Entities of one table, filtered by SQL
///
/// Runs `SELECT <id>::text FROM <table> WHERE <translated rules>` with every
/// rule argument bound as a parameter.
pub struct PostgresPopulation {
    pool: Arc<PgPool>,
    table: String,
    id_column: String,
    columns: ColumnMap,
}

impl PostgresPopulation {
    /// Create a population over `table`, keyed by an `id` column
    pub fn new(pool: Arc<PgPool>, table: impl Into<String>, columns: ColumnMap) -> Self {
        Self {
            pool,
            table: table.into(),
            id_column: "id".to_string(),
            columns,
        }
    }

    /// Use a different primary key column
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(text) => query.bind(text.clone()),
            SqlParam::Number(number) => query.bind(*number),
            SqlParam::Bool(flag) => query.bind(*flag),
            SqlParam::Timestamp(date) => query.bind(*date),
        };
    }
    query
}

#[async_trait::async_trait]
impl PopulationSource for PostgresPopulation {
    fn check_rules(&self, group: &ValidatedRuleGroup) -> Result<()> {
        self.columns.check(group)
    }

    async fn matching_ids(&self, group: &ValidatedRuleGroup) -> Result<BTreeSet<EntityId>> {
        let predicate = SqlAdapter::new(self.columns.clone())
            .with_now(Utc::now())
            .where_clause(group)?;

        let sql = format!(
            "SELECT {}::text FROM {} WHERE {}",
            self.id_column, self.table, predicate.sql
        );
        tracing::debug!("Population query: {} ({} params)", sql, predicate.params.len());

        let rows = bind_params(sqlx::query(&sql), &predicate.params)
            .fetch_all(&*self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(Into::into))
            .collect()
    }
}
