//! PostgreSQL segment repository
//!
//! Rule groups are stored as `jsonb` and exchanged with the database as
//! JSON text, so no sqlx json feature is needed.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::sync::Arc;

use crate::models::{is_valid_id, EmailTrigger, Segment, SegmentOngoingEmail};
use crate::traits::{SegmentRepository, WritableSegmentRepository};
use crate::{RepositoryError, RepositoryResult};

/// Segment repository backed by two PostgreSQL tables
///
/// # Example
/// ```no_run
/// use roster_repository::PostgresSegmentRepository;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let pool = sqlx::PgPool::connect("postgresql://localhost/roster").await?;
///     let repo = PostgresSegmentRepository::new(pool);
///     repo.ensure_tables().await?;
///     Ok(())
/// }
/// ```
pub struct PostgresSegmentRepository {
    pool: PgPool,
}

impl PostgresSegmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> RepositoryResult<Self> {
        Ok(Self::new(PgPool::connect(database_url).await?))
    }

    /// Create the `segments` and `segment_ongoing_emails` tables if absent
    pub async fn ensure_tables(&self) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS segments (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                rule_group JSONB NOT NULL,
                "order" INTEGER NOT NULL DEFAULT 0,
                newsletter_tag TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS segment_ongoing_emails (
                segment_id TEXT NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
                trigger TEXT NOT NULL,
                email_id TEXT NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                PRIMARY KEY (segment_id, trigger, email_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn segment_from_row(row: &PgRow) -> RepositoryResult<Segment> {
    let rule_group: String = row.try_get("rule_group")?;
    Ok(Segment {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        rule_group: serde_json::from_str(&rule_group)?,
        order: row.try_get("order")?,
        newsletter_tag: row.try_get("newsletter_tag")?,
    })
}

fn email_from_row(row: &PgRow) -> RepositoryResult<SegmentOngoingEmail> {
    let trigger: String = row.try_get("trigger")?;
    Ok(SegmentOngoingEmail {
        segment_id: row.try_get("segment_id")?,
        trigger: EmailTrigger::parse(&trigger)
            .ok_or_else(|| RepositoryError::Other(format!("Unknown email trigger: {}", trigger)))?,
        email_id: row.try_get("email_id")?,
        enabled: row.try_get("enabled")?,
    })
}

const SELECT_SEGMENT: &str = r#"SELECT id, name, description, rule_group::text AS rule_group, "order", newsletter_tag FROM segments"#;

#[async_trait]
impl SegmentRepository for PostgresSegmentRepository {
    async fn list_segments(&self) -> RepositoryResult<Vec<Segment>> {
        let rows = sqlx::query(&format!(r#"{} ORDER BY "order", name"#, SELECT_SEGMENT))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(segment_from_row).collect()
    }

    async fn load_segment(&self, id: &str) -> RepositoryResult<Segment> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_SEGMENT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;
        segment_from_row(&row)
    }

    async fn ongoing_emails(&self, segment_id: &str) -> RepositoryResult<Vec<SegmentOngoingEmail>> {
        let rows = sqlx::query(
            "SELECT segment_id, trigger, email_id, enabled FROM segment_ongoing_emails WHERE segment_id = $1",
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(email_from_row).collect()
    }
}

#[async_trait]
impl WritableSegmentRepository for PostgresSegmentRepository {
    async fn save_segment(&self, segment: &Segment) -> RepositoryResult<()> {
        if !is_valid_id(&segment.id) {
            return Err(RepositoryError::InvalidId {
                id: segment.id.clone(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO segments (id, name, description, rule_group, "order", newsletter_tag)
            VALUES ($1, $2, $3, $4::jsonb, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                rule_group = EXCLUDED.rule_group,
                "order" = EXCLUDED."order",
                newsletter_tag = EXCLUDED.newsletter_tag
            "#,
        )
        .bind(&segment.id)
        .bind(&segment.name)
        .bind(&segment.description)
        .bind(serde_json::to_string(&segment.rule_group)?)
        .bind(segment.order)
        .bind(&segment.newsletter_tag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_segment(&self, id: &str) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM segments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_ongoing_email(&self, email: &SegmentOngoingEmail) -> RepositoryResult<()> {
        if !self.exists(&email.segment_id).await? {
            return Err(RepositoryError::NotFound {
                id: email.segment_id.clone(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO segment_ongoing_emails (segment_id, trigger, email_id, enabled)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (segment_id, trigger, email_id) DO UPDATE SET enabled = EXCLUDED.enabled
            "#,
        )
        .bind(&email.segment_id)
        .bind(email.trigger.as_str())
        .bind(&email.email_id)
        .bind(email.enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn as_reader(self: Arc<Self>) -> Arc<dyn SegmentRepository> {
        self
    }
}
