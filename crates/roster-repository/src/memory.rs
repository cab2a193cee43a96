//! In-memory segment repository

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{is_valid_id, Segment, SegmentOngoingEmail};
use crate::traits::{SegmentRepository, WritableSegmentRepository};
use crate::{RepositoryError, RepositoryResult};

/// Segment repository held in memory, for tests and demos
#[derive(Default)]
pub struct MemorySegmentRepository {
    segments: RwLock<BTreeMap<String, Segment>>,
    emails: RwLock<Vec<SegmentOngoingEmail>>,
}

impl MemorySegmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from existing definitions
    pub fn with_segments(
        segments: impl IntoIterator<Item = Segment>,
        emails: impl IntoIterator<Item = SegmentOngoingEmail>,
    ) -> Self {
        Self {
            segments: RwLock::new(segments.into_iter().map(|s| (s.id.clone(), s)).collect()),
            emails: RwLock::new(emails.into_iter().collect()),
        }
    }
}

#[async_trait]
impl SegmentRepository for MemorySegmentRepository {
    async fn list_segments(&self) -> RepositoryResult<Vec<Segment>> {
        let mut segments: Vec<Segment> = self.segments.read().await.values().cloned().collect();
        segments.sort_by(Segment::display_cmp);
        Ok(segments)
    }

    async fn load_segment(&self, id: &str) -> RepositoryResult<Segment> {
        self.segments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })
    }

    async fn ongoing_emails(&self, segment_id: &str) -> RepositoryResult<Vec<SegmentOngoingEmail>> {
        Ok(self
            .emails
            .read()
            .await
            .iter()
            .filter(|email| email.segment_id == segment_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WritableSegmentRepository for MemorySegmentRepository {
    async fn save_segment(&self, segment: &Segment) -> RepositoryResult<()> {
        if !is_valid_id(&segment.id) {
            return Err(RepositoryError::InvalidId {
                id: segment.id.clone(),
            });
        }
        self.segments
            .write()
            .await
            .insert(segment.id.clone(), segment.clone());
        Ok(())
    }

    async fn delete_segment(&self, id: &str) -> RepositoryResult<bool> {
        let existed = self.segments.write().await.remove(id).is_some();
        self.emails.write().await.retain(|email| email.segment_id != id);
        Ok(existed)
    }

    async fn save_ongoing_email(&self, email: &SegmentOngoingEmail) -> RepositoryResult<()> {
        if !self.segments.read().await.contains_key(&email.segment_id) {
            return Err(RepositoryError::NotFound {
                id: email.segment_id.clone(),
            });
        }

        let mut emails = self.emails.write().await;
        match emails.iter_mut().find(|existing| existing.same_key(email)) {
            Some(existing) => *existing = email.clone(),
            None => emails.push(email.clone()),
        }
        Ok(())
    }

    fn as_reader(self: Arc<Self>) -> Arc<dyn SegmentRepository> {
        self
    }
}
