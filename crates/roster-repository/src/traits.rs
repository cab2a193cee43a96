//! Core trait definitions for segment storage
//!
//! - [`SegmentRepository`]: read interface used by the synchronizer
//! - [`WritableSegmentRepository`]: write interface used by the admin side
//!
//! Writes do not validate rule groups; callers go through
//! `roster_sdk::SegmentService`, which composes the contact schema and
//! rejects invalid rules before anything is stored.
//!
//! # Example
//!
//! ```
//! use roster_core::{Rule, RuleGroup};
//! use roster_repository::{
//!     EmailTrigger, MemorySegmentRepository, Segment, SegmentOngoingEmail,
//!     SegmentRepository, WritableSegmentRepository,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let repo = MemorySegmentRepository::new();
//! let rules = RuleGroup::and(vec![Rule::new("activeMembership", "equal", vec![true.into()]).into()]);
//!
//! repo.save_segment(&Segment::new("members", "Members", rules)).await?;
//! repo.save_ongoing_email(&SegmentOngoingEmail::new("members", EmailTrigger::OnJoin, "welcome"))
//!     .await?;
//!
//! assert_eq!(repo.list_segments().await?.len(), 1);
//! assert_eq!(repo.ongoing_emails("members").await?.len(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Segment, SegmentOngoingEmail};
use crate::RepositoryResult;

/// Read access to segment definitions
///
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait SegmentRepository: Send + Sync {
    /// Every segment, sorted by `order` then name
    async fn list_segments(&self) -> RepositoryResult<Vec<Segment>>;

    /// Load one segment
    ///
    /// Fails with [`RepositoryError::NotFound`](crate::RepositoryError::NotFound)
    /// when no segment has the id.
    async fn load_segment(&self, id: &str) -> RepositoryResult<Segment>;

    /// Ongoing emails of a segment, enabled or not
    async fn ongoing_emails(&self, segment_id: &str) -> RepositoryResult<Vec<SegmentOngoingEmail>>;

    /// Check whether a segment exists
    async fn exists(&self, id: &str) -> RepositoryResult<bool> {
        match self.load_segment(id).await {
            Ok(_) => Ok(true),
            Err(crate::RepositoryError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Write access to segment definitions
#[async_trait]
pub trait WritableSegmentRepository: SegmentRepository {
    /// Insert or replace a segment
    async fn save_segment(&self, segment: &Segment) -> RepositoryResult<()>;

    /// Delete a segment and its ongoing emails; returns whether it existed
    async fn delete_segment(&self, id: &str) -> RepositoryResult<bool>;

    /// Insert or replace an ongoing email, keyed by (segment, trigger, email)
    async fn save_ongoing_email(&self, email: &SegmentOngoingEmail) -> RepositoryResult<()>;

    /// The same repository behind its read-only interface
    fn as_reader(self: Arc<Self>) -> Arc<dyn SegmentRepository>;
}
