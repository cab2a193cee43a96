//! Side effects of a checkpointed membership change
//!
//! Every step is isolated: a failing send or tag update is logged and
//! counted, and the remaining steps still run. Nothing here can undo the
//! ledger checkpoint that precedes it.

use roster_repository::{EmailTrigger, Segment, SegmentOngoingEmail};
use roster_runtime::{
    Contact, ContactDirectory, EmailSender, EntityId, MembershipDiff, NewsletterProvider,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What a dispatch achieved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Successful email sends (one per email template)
    pub emails_sent: usize,
    /// Successful newsletter tag additions and removals
    pub tag_updates: usize,
    /// Failed directory lookups (including unresolved ids), sends and tag updates
    pub failures: usize,
}

/// Sends ongoing emails and mirrors the newsletter tag for a diff
pub struct SegmentDispatcher {
    directory: Arc<dyn ContactDirectory>,
    email_sender: Arc<dyn EmailSender>,
    newsletter: Arc<dyn NewsletterProvider>,
}

/// One side of a diff and what to do with it
struct Side<'a> {
    trigger: EmailTrigger,
    ids: &'a BTreeSet<EntityId>,
    emails: Vec<&'a SegmentOngoingEmail>,
}

impl SegmentDispatcher {
    pub fn new(
        directory: Arc<dyn ContactDirectory>,
        email_sender: Arc<dyn EmailSender>,
        newsletter: Arc<dyn NewsletterProvider>,
    ) -> Self {
        Self {
            directory,
            email_sender,
            newsletter,
        }
    }

    /// Fire on_join effects for `diff.joined` and on_leave effects for `diff.left`
    pub async fn dispatch(
        &self,
        segment: &Segment,
        emails: &[SegmentOngoingEmail],
        diff: &MembershipDiff,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for trigger in [EmailTrigger::OnJoin, EmailTrigger::OnLeave] {
            let side = Side {
                trigger,
                ids: match trigger {
                    EmailTrigger::OnJoin => &diff.joined,
                    EmailTrigger::OnLeave => &diff.left,
                },
                emails: emails
                    .iter()
                    .filter(|email| email.enabled && email.trigger == trigger)
                    .collect(),
            };
            self.dispatch_side(segment, side, &mut outcome).await;
        }

        outcome
    }

    async fn dispatch_side(&self, segment: &Segment, side: Side<'_>, outcome: &mut DispatchOutcome) {
        let tag = segment.newsletter_tag.as_deref();
        if side.ids.is_empty() || (side.emails.is_empty() && tag.is_none()) {
            return;
        }

        let contacts = match self.directory.contacts_by_ids(side.ids).await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!(
                    segment_id = %segment.id,
                    trigger = %side.trigger,
                    error = %e,
                    "Failed to load contacts for dispatch"
                );
                outcome.failures += 1;
                return;
            }
        };
        if contacts.len() < side.ids.len() {
            tracing::error!(
                segment_id = %segment.id,
                trigger = %side.trigger,
                missing = side.ids.len() - contacts.len(),
                "Contacts missing from directory"
            );
            outcome.failures += 1;
        }
        if contacts.is_empty() {
            return;
        }

        for email in &side.emails {
            match self
                .email_sender
                .send_email_to_contacts(&email.email_id, &contacts)
                .await
            {
                Ok(()) => outcome.emails_sent += 1,
                Err(e) => {
                    tracing::error!(
                        segment_id = %segment.id,
                        email_id = %email.email_id,
                        trigger = %side.trigger,
                        error = %e,
                        "Failed to send segment email"
                    );
                    outcome.failures += 1;
                }
            }
        }

        if let Some(tag) = tag {
            let addresses = email_addresses(&contacts);
            let result = match side.trigger {
                EmailTrigger::OnJoin => self.newsletter.add_tag_to_contacts(&addresses, tag).await,
                EmailTrigger::OnLeave => {
                    self.newsletter
                        .remove_tag_from_contacts(&addresses, tag)
                        .await
                }
            };
            match result {
                Ok(()) => outcome.tag_updates += 1,
                Err(e) => {
                    tracing::error!(
                        segment_id = %segment.id,
                        tag,
                        trigger = %side.trigger,
                        error = %e,
                        "Failed to update newsletter tag"
                    );
                    outcome.failures += 1;
                }
            }
        }
    }
}

fn email_addresses(contacts: &[Contact]) -> Vec<String> {
    contacts.iter().map(|contact| contact.email.clone()).collect()
}
