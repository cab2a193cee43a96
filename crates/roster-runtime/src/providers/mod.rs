//! Side-effect providers used when segment membership changes
//!
//! Providers are consumed through traits so the synchronizer never depends
//! on a concrete newsletter service or mail transport. The bundled
//! implementations log instead of calling out, and an in-memory directory
//! resolves contact ids for tests and demos.

mod directory;
mod logging;
#[cfg(feature = "sqlx")]
mod postgresql;

pub use directory::MemoryContactDirectory;
pub use logging::{LoggingEmailSender, LoggingNewsletterProvider};
#[cfg(feature = "sqlx")]
pub use postgresql::PostgresContactDirectory;

use crate::error::Result;
use crate::population::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contact details needed to address a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: EntityId,
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl Contact {
    pub fn new(
        id: impl Into<EntityId>,
        email: impl Into<String>,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            firstname: firstname.into(),
            lastname: lastname.into(),
        }
    }
}

/// Newsletter tagging
#[async_trait::async_trait]
pub trait NewsletterProvider: Send + Sync {
    /// Tag every address; an empty list is a no-op
    async fn add_tag_to_contacts(&self, emails: &[String], tag: &str) -> Result<()>;

    /// Untag every address; an empty list is a no-op
    async fn remove_tag_from_contacts(&self, emails: &[String], tag: &str) -> Result<()>;
}

/// Transactional email delivery
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one email template to every contact
    async fn send_email_to_contacts(&self, email_id: &str, contacts: &[Contact]) -> Result<()>;
}

/// Contact lookup by id
#[async_trait::async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Contacts for the given ids; unknown ids are omitted
    async fn contacts_by_ids(&self, ids: &BTreeSet<EntityId>) -> Result<Vec<Contact>>;
}
