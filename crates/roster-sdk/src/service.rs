//! Validated writes of segment definitions

use roster_core::ValidatedRuleGroup;
use roster_repository::{Segment, SegmentOngoingEmail, WritableSegmentRepository};
use roster_runtime::PopulationSource;
use std::sync::Arc;

use crate::composer::ContactSchemaComposer;
use crate::error::Result;

/// Admin-side entry point for segment storage
///
/// Rule groups are validated against the composed contact schema before
/// anything is written; an invalid group surfaces as
/// [`SdkError::InvalidRules`](crate::SdkError::InvalidRules). A group the
/// population cannot evaluate (e.g. callout fields against a SQL table)
/// surfaces as [`SdkError::Runtime`](crate::SdkError::Runtime).
pub struct SegmentService {
    repository: Arc<dyn WritableSegmentRepository>,
    composer: Arc<ContactSchemaComposer>,
    population: Arc<dyn PopulationSource>,
}

impl SegmentService {
    pub fn new(
        repository: Arc<dyn WritableSegmentRepository>,
        composer: Arc<ContactSchemaComposer>,
        population: Arc<dyn PopulationSource>,
    ) -> Self {
        Self {
            repository,
            composer,
            population,
        }
    }

    /// Validate a segment's rules without saving
    pub async fn check_segment(&self, segment: &Segment) -> Result<ValidatedRuleGroup> {
        let validated = self.composer.validate(&segment.rule_group).await?;
        self.population.check_rules(&validated)?;
        Ok(validated)
    }

    /// Validate then insert or replace a segment
    pub async fn save_segment(&self, segment: &Segment) -> Result<()> {
        self.check_segment(segment).await?;
        self.repository.save_segment(segment).await?;
        tracing::info!(segment_id = %segment.id, "Segment saved");
        Ok(())
    }

    /// Delete a segment; returns whether it existed
    pub async fn delete_segment(&self, id: &str) -> Result<bool> {
        Ok(self.repository.delete_segment(id).await?)
    }

    pub async fn save_ongoing_email(&self, email: &SegmentOngoingEmail) -> Result<()> {
        Ok(self.repository.save_ongoing_email(email).await?)
    }

    pub async fn list_segments(&self) -> Result<Vec<Segment>> {
        Ok(self.repository.list_segments().await?)
    }
}
