//! Roster Runtime - Query execution and side-effect plumbing
//!
//! This crate turns validated rule trees into backend queries and provides
//! the storage and provider seams the segment synchronizer runs against:
//! - Query adapters (PostgreSQL `WHERE` clauses, in-memory predicates)
//! - Population sources answering "who matches now"
//! - Membership ledgers holding the last checkpointed membership
//! - Newsletter, email and contact directory providers
//!
//! PostgreSQL backends are available behind the `sqlx` feature.

pub mod error;
pub mod ledger;
pub mod population;
pub mod providers;
pub mod query;

// Re-export main types
pub use error::{Result, RuntimeError};
pub use ledger::{FileLedger, MembershipDiff, MembershipLedger, MemoryLedger};
pub use population::{EntityId, MemoryPopulation, PopulationSource};
pub use providers::{
    Contact, ContactDirectory, EmailSender, LoggingEmailSender, LoggingNewsletterProvider,
    MemoryContactDirectory, NewsletterProvider,
};
pub use query::{
    ColumnMap, FieldValue, MemoryAdapter, QueryAdapter, Record, RecordPredicate, SqlAdapter,
    SqlParam, SqlPredicate,
};

#[cfg(feature = "sqlx")]
pub use ledger::PostgresLedger;
#[cfg(feature = "sqlx")]
pub use population::PostgresPopulation;
#[cfg(feature = "sqlx")]
pub use providers::PostgresContactDirectory;
