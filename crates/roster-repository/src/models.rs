//! Stored segment definitions

use roster_core::RuleGroup;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A saved contact filter whose membership is tracked over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Contact rules defining membership
    pub rule_group: RuleGroup,
    /// Display position; lower first
    #[serde(default)]
    pub order: i32,
    /// Newsletter tag mirrored onto members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newsletter_tag: Option<String>,
}

impl Segment {
    /// Create a segment with no description, order 0 and no tag
    pub fn new(id: impl Into<String>, name: impl Into<String>, rule_group: RuleGroup) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rule_group,
            order: 0,
            newsletter_tag: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_newsletter_tag(mut self, tag: impl Into<String>) -> Self {
        self.newsletter_tag = Some(tag.into());
        self
    }

    /// Listing order: `order`, then name
    pub fn display_cmp(&self, other: &Segment) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// When an ongoing email fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTrigger {
    OnJoin,
    OnLeave,
}

impl EmailTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailTrigger::OnJoin => "on_join",
            EmailTrigger::OnLeave => "on_leave",
        }
    }

    pub fn parse(value: &str) -> Option<EmailTrigger> {
        match value {
            "on_join" => Some(EmailTrigger::OnJoin),
            "on_leave" => Some(EmailTrigger::OnLeave),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmailTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An email sent to contacts entering or leaving a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentOngoingEmail {
    pub segment_id: String,
    pub trigger: EmailTrigger,
    pub email_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SegmentOngoingEmail {
    /// Enabled email for the given trigger
    pub fn new(
        segment_id: impl Into<String>,
        trigger: EmailTrigger,
        email_id: impl Into<String>,
    ) -> Self {
        Self {
            segment_id: segment_id.into(),
            trigger,
            email_id: email_id.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether two entries describe the same (segment, trigger, email)
    pub fn same_key(&self, other: &SegmentOngoingEmail) -> bool {
        self.segment_id == other.segment_id
            && self.trigger == other.trigger
            && self.email_id == other.email_id
    }
}

/// Ids double as storage keys, so restrict them to a safe alphabet
pub(crate) fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
