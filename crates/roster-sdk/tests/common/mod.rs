//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use roster_repository::{MemorySegmentRepository, WritableSegmentRepository};
use roster_runtime::{
    Contact, EmailSender, FieldValue, MembershipDiff, MembershipLedger, MemoryContactDirectory,
    MemoryLedger, MemoryPopulation, NewsletterProvider, Record, Result, RuntimeError,
};
use roster_sdk::{SegmentEngine, SegmentEngineBuilder};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn record(fields: &[(&str, FieldValue)]) -> Record {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect::<HashMap<_, _>>()
}

pub fn member(active: bool) -> Record {
    record(&[("activeMembership", active.into())])
}

pub fn contact(id: &str) -> Contact {
    Contact::new(id, format!("{}@example.org", id), id.to_uppercase(), "Tester")
}

pub fn directory(ids: &[&str]) -> Arc<MemoryContactDirectory> {
    Arc::new(MemoryContactDirectory::with_contacts(
        ids.iter().map(|id| contact(id)),
    ))
}

pub fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Email sender recording every call
#[derive(Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingEmailSender {
    /// Recipient ids of every send of `email_id`, in call order
    pub async fn recipients(&self, email_id: &str) -> Vec<Vec<String>> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == email_id)
            .map(|(_, to)| to.clone())
            .collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_email_to_contacts(&self, email_id: &str, contacts: &[Contact]) -> Result<()> {
        let to = contacts.iter().map(|c| c.id.clone()).collect();
        self.sent.lock().await.push((email_id.to_string(), to));
        Ok(())
    }
}

/// Email sender that always fails
#[derive(Default)]
pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send_email_to_contacts(&self, _email_id: &str, _contacts: &[Contact]) -> Result<()> {
        Err(RuntimeError::Provider(anyhow::anyhow!("mail transport down")))
    }
}

/// Newsletter provider recording tag changes as `(tag, +/-, addresses)`
#[derive(Default)]
pub struct RecordingNewsletter {
    pub changes: Mutex<Vec<(String, char, Vec<String>)>>,
}

#[async_trait]
impl NewsletterProvider for RecordingNewsletter {
    async fn add_tag_to_contacts(&self, emails: &[String], tag: &str) -> Result<()> {
        self.changes
            .lock()
            .await
            .push((tag.to_string(), '+', emails.to_vec()));
        Ok(())
    }

    async fn remove_tag_from_contacts(&self, emails: &[String], tag: &str) -> Result<()> {
        self.changes
            .lock()
            .await
            .push((tag.to_string(), '-', emails.to_vec()));
        Ok(())
    }
}

/// Ledger whose checkpoint always fails
#[derive(Default)]
pub struct FailingLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl MembershipLedger for FailingLedger {
    async fn members(&self, segment_id: &str) -> Result<BTreeSet<String>> {
        self.inner.members(segment_id).await
    }

    async fn apply_diff(&self, _segment_id: &str, _diff: &MembershipDiff) -> Result<()> {
        Err(RuntimeError::Database("connection reset".to_string()))
    }
}

/// Everything a synchronizer test needs to observe
pub struct Harness {
    pub engine: SegmentEngine,
    pub repository: Arc<MemorySegmentRepository>,
    pub population: Arc<MemoryPopulation>,
    pub ledger: Arc<MemoryLedger>,
    pub emails: Arc<RecordingEmailSender>,
    pub newsletter: Arc<RecordingNewsletter>,
}

impl Harness {
    pub async fn new(population: MemoryPopulation, contact_ids: &[&str]) -> Self {
        Self::with_sender(population, contact_ids, None).await
    }

    pub async fn with_sender(
        population: MemoryPopulation,
        contact_ids: &[&str],
        sender: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        let repository = Arc::new(MemorySegmentRepository::new());
        let population = Arc::new(population.with_now(fixed_now()));
        let ledger = Arc::new(MemoryLedger::new());
        let emails = Arc::new(RecordingEmailSender::default());
        let newsletter = Arc::new(RecordingNewsletter::default());

        let sender: Arc<dyn EmailSender> = match sender {
            Some(sender) => sender,
            None => emails.clone(),
        };

        let engine = SegmentEngineBuilder::new()
            .with_repository(repository.clone() as Arc<dyn WritableSegmentRepository>)
            .with_population(population.clone())
            .with_ledger(ledger.clone())
            .with_directory(directory(contact_ids))
            .with_email_sender(sender)
            .with_newsletter(newsletter.clone())
            .build()
            .await
            .unwrap();

        Self {
            engine,
            repository,
            population,
            ledger,
            emails,
            newsletter,
        }
    }
}
