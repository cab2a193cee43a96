//! Static filter schemas per entity
//!
//! Each schema is built once per process and is read-only afterwards.

use super::definition::{FilterField, FilterSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Entities that can be filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterEntity {
    Contact,
    Callout,
    CalloutResponse,
    Payment,
    Notice,
    Segment,
}

impl FilterEntity {
    pub const ALL: [FilterEntity; 6] = [
        FilterEntity::Contact,
        FilterEntity::Callout,
        FilterEntity::CalloutResponse,
        FilterEntity::Payment,
        FilterEntity::Notice,
        FilterEntity::Segment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterEntity::Contact => "contact",
            FilterEntity::Callout => "callout",
            FilterEntity::CalloutResponse => "callout_response",
            FilterEntity::Payment => "payment",
            FilterEntity::Notice => "notice",
            FilterEntity::Segment => "segment",
        }
    }

    /// The static filter schema of this entity
    pub fn schema(&self) -> &'static FilterSchema {
        static CONTACT: OnceLock<FilterSchema> = OnceLock::new();
        static CALLOUT: OnceLock<FilterSchema> = OnceLock::new();
        static CALLOUT_RESPONSE: OnceLock<FilterSchema> = OnceLock::new();
        static PAYMENT: OnceLock<FilterSchema> = OnceLock::new();
        static NOTICE: OnceLock<FilterSchema> = OnceLock::new();
        static SEGMENT: OnceLock<FilterSchema> = OnceLock::new();

        match self {
            FilterEntity::Contact => CONTACT.get_or_init(contact_filters),
            FilterEntity::Callout => CALLOUT.get_or_init(callout_filters),
            FilterEntity::CalloutResponse => CALLOUT_RESPONSE.get_or_init(callout_response_filters),
            FilterEntity::Payment => PAYMENT.get_or_init(payment_filters),
            FilterEntity::Notice => NOTICE.get_or_init(notice_filters),
            FilterEntity::Segment => SEGMENT.get_or_init(segment_filters),
        }
    }
}

impl fmt::Display for FilterEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| format!("Unknown filter entity: {}", s))
    }
}

fn contact_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("id", FilterField::contact())
        .with_field("firstname", FilterField::text())
        .with_field("lastname", FilterField::text())
        .with_field("email", FilterField::text())
        .with_field("joined", FilterField::date())
        .with_field("lastSeen", FilterField::date().nullable())
        .with_field(
            "contributionType",
            FilterField::enumeration(["Automatic", "Manual", "Gift", "None"]),
        )
        .with_field("contributionMonthlyAmount", FilterField::number().nullable())
        .with_field(
            "contributionPeriod",
            FilterField::enumeration(["monthly", "annually"]).nullable(),
        )
        .with_field("deliveryOptIn", FilterField::boolean())
        .with_field(
            "newsletterStatus",
            FilterField::enumeration(["subscribed", "unsubscribed", "cleaned", "pending", "none"]),
        )
        .with_field("newsletterGroups", FilterField::array())
        .with_field(
            "activePermission",
            FilterField::enumeration(["member", "admin", "superadmin"]).nullable(),
        )
        .with_field("activeMembership", FilterField::boolean())
        .with_field("membershipStarts", FilterField::date().nullable())
        .with_field("membershipExpires", FilterField::date().nullable())
        .with_field("manualPaymentSource", FilterField::text().nullable())
        .with_field("tags", FilterField::array())
        .with_field("segments", FilterField::array())
}

fn callout_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("slug", FilterField::text())
        .with_field("title", FilterField::text())
        .with_field(
            "status",
            FilterField::enumeration(["open", "finished", "scheduled", "ended"]),
        )
        .with_field("answeredBy", FilterField::contact())
        .with_field("starts", FilterField::date().nullable())
        .with_field("expires", FilterField::date().nullable())
        .with_field("hidden", FilterField::boolean())
        .with_field("responseCount", FilterField::number())
}

fn callout_response_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("id", FilterField::text())
        .with_field("contact", FilterField::contact().nullable())
        .with_field("callout", FilterField::text())
        .with_field("createdAt", FilterField::date())
        .with_field("updatedAt", FilterField::date())
        .with_field("bucket", FilterField::text().nullable())
        .with_field("tags", FilterField::array())
        .with_field("assignee", FilterField::contact().nullable())
        .with_field("answers", FilterField::blob())
}

fn payment_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("id", FilterField::text())
        .with_field("contact", FilterField::contact())
        .with_field("chargeDate", FilterField::date())
        .with_field("amount", FilterField::number())
        .with_field(
            "status",
            FilterField::enumeration(["pending", "successful", "failed", "cancelled"]),
        )
}

fn notice_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("createdAt", FilterField::date())
        .with_field("updatedAt", FilterField::date())
        .with_field("name", FilterField::text())
        .with_field("expires", FilterField::date().nullable())
        .with_field("starts", FilterField::date().nullable())
        .with_field("enabled", FilterField::boolean())
        .with_field("text", FilterField::text())
        .with_field(
            "status",
            FilterField::enumeration(["open", "finished", "scheduled"]),
        )
}

fn segment_filters() -> FilterSchema {
    FilterSchema::new()
        .with_field("id", FilterField::text())
        .with_field("name", FilterField::text())
        .with_field("description", FilterField::blob())
        .with_field("order", FilterField::number())
}
