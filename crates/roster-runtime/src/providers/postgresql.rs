//! PostgreSQL contact directory

use super::{Contact, ContactDirectory};
use crate::error::Result;
use crate::population::EntityId;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Contacts read from the population table
///
/// Defaults to columns `id`, `email`, `firstname` and `lastname`; missing
/// names come back as empty strings.
pub struct PostgresContactDirectory {
    pool: Arc<PgPool>,
    table: String,
    id_column: String,
    email_column: String,
    firstname_column: String,
    lastname_column: String,
}

impl PostgresContactDirectory {
    pub fn new(pool: Arc<PgPool>, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            id_column: "id".to_string(),
            email_column: "email".to_string(),
            firstname_column: "firstname".to_string(),
            lastname_column: "lastname".to_string(),
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    /// Use different email and name columns
    pub fn with_columns(
        mut self,
        email: impl Into<String>,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
    ) -> Self {
        self.email_column = email.into();
        self.firstname_column = firstname.into();
        self.lastname_column = lastname.into();
        self
    }

    fn lookup_sql(&self) -> String {
        format!(
            "SELECT {id}::text, {email}, COALESCE({first}, ''), COALESCE({last}, '') \
             FROM {table} WHERE {id}::text = ANY($1) AND {email} IS NOT NULL",
            id = self.id_column,
            email = self.email_column,
            first = self.firstname_column,
            last = self.lastname_column,
            table = self.table,
        )
    }
}

#[async_trait::async_trait]
impl ContactDirectory for PostgresContactDirectory {
    async fn contacts_by_ids(&self, ids: &BTreeSet<EntityId>) -> Result<Vec<Contact>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().cloned().collect();
        let rows = sqlx::query(&self.lookup_sql())
            .bind(&ids)
            .fetch_all(&*self.pool)
            .await?;

        let contacts = rows
            .iter()
            .map(|row| {
                Ok(Contact::new(
                    row.try_get::<String, _>(0)?,
                    row.try_get::<String, _>(1)?,
                    row.try_get::<String, _>(2)?,
                    row.try_get::<String, _>(3)?,
                ))
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        tracing::debug!(
            requested = ids.len(),
            found = contacts.len(),
            "Loaded contacts from {}",
            self.table
        );
        Ok(contacts)
    }
}
