//! Providers that log instead of calling out

use super::{Contact, EmailSender, NewsletterProvider};
use crate::error::Result;

/// Newsletter provider that records tag changes in the log
#[derive(Debug, Default, Clone)]
pub struct LoggingNewsletterProvider;

impl LoggingNewsletterProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl NewsletterProvider for LoggingNewsletterProvider {
    async fn add_tag_to_contacts(&self, emails: &[String], tag: &str) -> Result<()> {
        if !emails.is_empty() {
            tracing::info!(tag, count = emails.len(), "Adding newsletter tag");
        }
        Ok(())
    }

    async fn remove_tag_from_contacts(&self, emails: &[String], tag: &str) -> Result<()> {
        if !emails.is_empty() {
            tracing::info!(tag, count = emails.len(), "Removing newsletter tag");
        }
        Ok(())
    }
}

/// Email sender that records deliveries in the log
#[derive(Debug, Default, Clone)]
pub struct LoggingEmailSender;

impl LoggingEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_email_to_contacts(&self, email_id: &str, contacts: &[Contact]) -> Result<()> {
        if contacts.is_empty() {
            return Ok(());
        }
        tracing::info!(email = email_id, count = contacts.len(), "Sending email");
        for contact in contacts {
            tracing::debug!(email = email_id, to = %contact.email, "Queued delivery");
        }
        Ok(())
    }
}
