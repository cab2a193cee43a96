//! In-memory contact directory

use super::{Contact, ContactDirectory};
use crate::error::{Result, RuntimeError};
use crate::population::EntityId;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Contact directory held in memory
#[derive(Default)]
pub struct MemoryContactDirectory {
    contacts: RwLock<HashMap<EntityId, Contact>>,
}

impl MemoryContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of contacts
    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let contacts = contacts
            .into_iter()
            .map(|contact| (contact.id.clone(), contact))
            .collect();
        Self {
            contacts: RwLock::new(contacts),
        }
    }

    /// Load contacts from a JSON array
    pub fn from_json(json: &str) -> Result<Self> {
        let contacts: Vec<Contact> = serde_json::from_str(json)
            .map_err(|e| RuntimeError::InvalidData(format!("Invalid contacts JSON: {}", e)))?;
        Ok(Self::with_contacts(contacts))
    }

    /// Insert or replace a contact
    pub async fn insert(&self, contact: Contact) {
        self.contacts
            .write()
            .await
            .insert(contact.id.clone(), contact);
    }
}

#[async_trait::async_trait]
impl ContactDirectory for MemoryContactDirectory {
    async fn contacts_by_ids(&self, ids: &BTreeSet<EntityId>) -> Result<Vec<Contact>> {
        let contacts = self.contacts.read().await;
        let found: Vec<Contact> = ids.iter().filter_map(|id| contacts.get(id).cloned()).collect();

        if found.len() < ids.len() {
            tracing::debug!(
                "{} of {} contact ids not found in directory",
                ids.len() - found.len(),
                ids.len()
            );
        }

        Ok(found)
    }
}
