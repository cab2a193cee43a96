//! Segment membership synchronizer
//!
//! A run moves one segment through `Idle -> Evaluating -> Diffing ->
//! Dispatching -> Idle`:
//!
//! 1. Evaluating: validate the stored rules against today's schema and query
//!    the population for everyone who matches.
//! 2. Diffing: compare against the ledger and checkpoint the diff.
//! 3. Dispatching: fire ongoing emails and newsletter tag changes.
//!
//! The checkpoint comes before any side effect, so a crash or failing
//! provider can lose a notification but never replay one. Runs of the same
//! segment are serialized; different segments run concurrently.

use futures::stream::{self, StreamExt};
use roster_core::FilterError;
use roster_repository::{Segment, SegmentRepository};
use roster_runtime::{EntityId, MembershipDiff, MembershipLedger, PopulationSource};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::composer::ContactSchemaComposer;
use crate::config::SyncConfig;
use crate::dispatch::SegmentDispatcher;
use crate::error::{Result, SdkError};

/// Phase of a segment run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    #[default]
    Idle,
    Evaluating,
    Diffing,
    Dispatching,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Evaluating => "evaluating",
            RunState::Diffing => "diffing",
            RunState::Dispatching => "dispatching",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one segment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentRunReport {
    /// Membership checkpointed and side effects attempted
    Synced {
        segment_id: String,
        joined: BTreeSet<EntityId>,
        left: BTreeSet<EntityId>,
        dispatch_failures: usize,
    },
    /// Stored rules no longer validate; ledger untouched
    Skipped { segment_id: String, reason: String },
    /// Query or checkpoint failed; nothing dispatched
    Failed { segment_id: String, error: String },
}

impl SegmentRunReport {
    pub fn segment_id(&self) -> &str {
        match self {
            SegmentRunReport::Synced { segment_id, .. }
            | SegmentRunReport::Skipped { segment_id, .. }
            | SegmentRunReport::Failed { segment_id, .. } => segment_id,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SegmentRunReport::Synced { .. })
    }
}

/// A stored segment whose rules fail against the current schema
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidSegment {
    pub segment_id: String,
    pub error: FilterError,
}

/// Keeps segment ledgers in step with the population
pub struct SegmentSynchronizer {
    repository: Arc<dyn SegmentRepository>,
    population: Arc<dyn PopulationSource>,
    ledger: Arc<dyn MembershipLedger>,
    composer: Arc<ContactSchemaComposer>,
    dispatcher: SegmentDispatcher,
    config: SyncConfig,
    run_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    states: RwLock<HashMap<String, RunState>>,
}

impl SegmentSynchronizer {
    pub fn new(
        repository: Arc<dyn SegmentRepository>,
        population: Arc<dyn PopulationSource>,
        ledger: Arc<dyn MembershipLedger>,
        composer: Arc<ContactSchemaComposer>,
        dispatcher: SegmentDispatcher,
        config: SyncConfig,
    ) -> Self {
        Self {
            repository,
            population,
            ledger,
            composer,
            dispatcher,
            config,
            run_locks: Mutex::new(HashMap::new()),
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current phase of a segment's run
    pub async fn state(&self, segment_id: &str) -> RunState {
        self.states
            .read()
            .await
            .get(segment_id)
            .copied()
            .unwrap_or_default()
    }

    /// Run one segment
    ///
    /// Waits for any run of the same segment already in progress.
    pub async fn sync_segment(&self, segment_id: &str) -> Result<SegmentRunReport> {
        let segment = self.repository.load_segment(segment_id).await?;
        self.run(&segment).await
    }

    /// Run every stored segment, `concurrency` at a time
    ///
    /// A failing segment is reported and never stops the sweep. Reports
    /// follow the listing order.
    pub async fn sync_all(&self) -> Result<Vec<SegmentRunReport>> {
        let segments = self.repository.list_segments().await?;
        tracing::info!(
            segments = segments.len(),
            concurrency = self.config.concurrency,
            "Starting segment sweep"
        );

        let mut reports: Vec<(usize, SegmentRunReport)> = stream::iter(segments.iter().enumerate())
            .map(|(index, segment)| async move {
                let report = match self.run(segment).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(segment_id = %segment.id, error = %e, "Segment run failed");
                        SegmentRunReport::Failed {
                            segment_id: segment.id.clone(),
                            error: e.to_string(),
                        }
                    }
                };
                (index, report)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);
        let reports: Vec<SegmentRunReport> = reports.into_iter().map(|(_, r)| r).collect();

        tracing::info!(
            synced = reports.iter().filter(|r| r.is_synced()).count(),
            total = reports.len(),
            "Finished segment sweep"
        );
        Ok(reports)
    }

    /// Stored segments whose rules no longer validate
    pub async fn revalidate_segments(&self) -> Result<Vec<InvalidSegment>> {
        let mut invalid = Vec::new();

        for segment in self.repository.list_segments().await? {
            match self.composer.validate(&segment.rule_group).await {
                Ok(_) => {}
                Err(SdkError::InvalidRules(error)) => invalid.push(InvalidSegment {
                    segment_id: segment.id,
                    error,
                }),
                Err(e) => return Err(e),
            }
        }

        Ok(invalid)
    }

    async fn run_lock(&self, segment_id: &str) -> Arc<Mutex<()>> {
        self.run_locks
            .lock()
            .await
            .entry(segment_id.to_string())
            .or_default()
            .clone()
    }

    async fn set_state(&self, segment_id: &str, state: RunState) {
        tracing::debug!(segment_id, %state, "Segment run state");
        self.states
            .write()
            .await
            .insert(segment_id.to_string(), state);
    }

    /// Drop the segment's lock entry unless another run holds a clone
    async fn release_run_lock(&self, segment_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.run_locks.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(segment_id);
        }
    }

    async fn run(&self, segment: &Segment) -> Result<SegmentRunReport> {
        let lock = self.run_lock(&segment.id).await;

        let result = {
            let _guard = lock.lock().await;
            tracing::info!(segment_id = %segment.id, name = %segment.name, "Syncing segment");
            let result = self.run_locked(segment).await;
            // Idle is the default, so no entry is kept between runs
            self.states.write().await.remove(&segment.id);
            result
        };

        self.release_run_lock(&segment.id, lock).await;
        result
    }

    async fn run_locked(&self, segment: &Segment) -> Result<SegmentRunReport> {
        self.set_state(&segment.id, RunState::Evaluating).await;

        let validated = match self.composer.validate(&segment.rule_group).await {
            Ok(validated) => validated,
            Err(SdkError::InvalidRules(error)) => {
                tracing::warn!(
                    segment_id = %segment.id,
                    error = %error,
                    "Stored segment rules no longer validate, skipping"
                );
                return Ok(SegmentRunReport::Skipped {
                    segment_id: segment.id.clone(),
                    reason: error.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let matched = self.population.matching_ids(&validated).await?;

        self.set_state(&segment.id, RunState::Diffing).await;
        let previous = self.ledger.members(&segment.id).await?;
        let diff = MembershipDiff::compute(&previous, &matched);
        if !diff.is_empty() {
            self.ledger.apply_diff(&segment.id, &diff).await?;
        }

        self.set_state(&segment.id, RunState::Dispatching).await;
        let mut dispatch_failures = 0;
        if !diff.is_empty() {
            match self.repository.ongoing_emails(&segment.id).await {
                Ok(emails) => {
                    let outcome = self.dispatcher.dispatch(segment, &emails, &diff).await;
                    dispatch_failures = outcome.failures;
                }
                Err(e) => {
                    tracing::error!(
                        segment_id = %segment.id,
                        error = %e,
                        "Failed to load ongoing emails"
                    );
                    dispatch_failures = 1;
                }
            }
        }

        tracing::info!(
            segment_id = %segment.id,
            members = matched.len(),
            joined = diff.joined.len(),
            left = diff.left.len(),
            dispatch_failures,
            "Segment synced"
        );

        Ok(SegmentRunReport::Synced {
            segment_id: segment.id.clone(),
            joined: diff.joined,
            left: diff.left,
            dispatch_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::SegmentEngineBuilder;
    use roster_core::{Rule, RuleGroup};
    use roster_repository::{MemorySegmentRepository, Segment, WritableSegmentRepository};
    use roster_runtime::{FieldValue, MemoryPopulation};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finished_runs_leave_no_bookkeeping() {
        let record: HashMap<String, FieldValue> =
            HashMap::from([("activeMembership".to_string(), true.into())]);
        let repository = Arc::new(MemorySegmentRepository::new());
        let engine = SegmentEngineBuilder::new()
            .with_repository(repository.clone())
            .with_population(Arc::new(MemoryPopulation::new().with_record("a", record)))
            .build()
            .await
            .unwrap();

        for id in ["one", "two", "three"] {
            repository
                .save_segment(&Segment::new(
                    id,
                    id,
                    RuleGroup::and(vec![
                        Rule::new("activeMembership", "equal", vec![true.into()]).into()
                    ]),
                ))
                .await
                .unwrap();
        }

        let sync = engine.synchronizer();
        let runs = futures::future::join_all([
            sync.sync_segment("one"),
            sync.sync_segment("one"),
            sync.sync_segment("two"),
        ])
        .await;
        assert!(runs.iter().all(|r| r.as_ref().unwrap().is_synced()));
        sync.sync_all().await.unwrap();

        assert!(repository.delete_segment("three").await.unwrap());
        sync.sync_all().await.unwrap();

        assert!(sync.run_locks.lock().await.is_empty());
        assert!(sync.states.read().await.is_empty());
    }
}
