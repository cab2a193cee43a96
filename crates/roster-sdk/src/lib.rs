//! Roster SDK
//!
//! Segment orchestration on top of the rule engine: keeps segment
//! membership in step with the contact population and fires the ongoing
//! emails and newsletter tag changes attached to each segment.

pub mod builder;
pub mod composer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod service;
pub mod sync;

// Re-export main types
pub use builder::{SegmentEngine, SegmentEngineBuilder};
pub use composer::{CalloutFormSource, ContactSchemaComposer, MemoryCalloutFormSource};
pub use config::SyncConfig;
pub use dispatch::{DispatchOutcome, SegmentDispatcher};
pub use error::{Result, SdkError};
pub use service::SegmentService;
pub use sync::{InvalidSegment, RunState, SegmentRunReport, SegmentSynchronizer};

// Re-export commonly used types from dependencies
pub use roster_core::{Rule, RuleGroup};
pub use roster_repository::{EmailTrigger, RepositoryConfig, Segment, SegmentOngoingEmail};
