//! Integration tests for the segment membership synchronizer

mod common;

use common::*;
use roster_core::{Rule, RuleGroup};
use roster_repository::{
    EmailTrigger, Segment, SegmentOngoingEmail, SegmentRepository, WritableSegmentRepository,
};
use roster_runtime::{EmailSender, MembershipLedger, MemoryPopulation};
use roster_sdk::{RunState, SegmentEngineBuilder, SegmentRunReport, SdkError};
use std::sync::Arc;

fn active_members() -> Segment {
    Segment::new(
        "active",
        "Active members",
        RuleGroup::and(vec![
            Rule::new("activeMembership", "equal", vec![true.into()]).into()
        ]),
    )
    .with_newsletter_tag("members")
}

async fn add_segment_with_emails(harness: &Harness, segment: &Segment) {
    harness.repository.save_segment(segment).await.unwrap();
    harness
        .repository
        .save_ongoing_email(&SegmentOngoingEmail::new(
            &segment.id,
            EmailTrigger::OnJoin,
            "welcome",
        ))
        .await
        .unwrap();
    harness
        .repository
        .save_ongoing_email(&SegmentOngoingEmail::new(
            &segment.id,
            EmailTrigger::OnLeave,
            "goodbye",
        ))
        .await
        .unwrap();
}

fn two_active_members() -> MemoryPopulation {
    MemoryPopulation::new()
        .with_record("a", member(true))
        .with_record("b", member(true))
        .with_record("x", member(false))
}

#[tokio::test]
async fn test_membership_diff_across_runs() {
    let harness = Harness::new(two_active_members(), &["a", "b", "c", "x"]).await;
    add_segment_with_emails(&harness, &active_members()).await;
    let sync = harness.engine.synchronizer();

    let first = sync.sync_segment("active").await.unwrap();
    assert_eq!(
        first,
        SegmentRunReport::Synced {
            segment_id: "active".to_string(),
            joined: ids(&["a", "b"]),
            left: ids(&[]),
            dispatch_failures: 0,
        }
    );

    // {a, b} -> {b, c}
    assert!(
        harness
            .population
            .set_field("a", "activeMembership", false.into())
            .await
    );
    harness.population.insert("c", member(true)).await;

    let second = sync.sync_segment("active").await.unwrap();
    assert_eq!(
        second,
        SegmentRunReport::Synced {
            segment_id: "active".to_string(),
            joined: ids(&["c"]),
            left: ids(&["a"]),
            dispatch_failures: 0,
        }
    );

    assert_eq!(harness.ledger.members("active").await.unwrap(), ids(&["b", "c"]));
    assert_eq!(
        harness.emails.recipients("welcome").await,
        vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
    );
    assert_eq!(
        harness.emails.recipients("goodbye").await,
        vec![vec!["a".to_string()]]
    );

    let changes = harness.newsletter.changes.lock().await.clone();
    assert_eq!(
        changes,
        vec![
            (
                "members".to_string(),
                '+',
                vec!["a@example.org".to_string(), "b@example.org".to_string()]
            ),
            ("members".to_string(), '+', vec!["c@example.org".to_string()]),
            ("members".to_string(), '-', vec!["a@example.org".to_string()]),
        ]
    );
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() {
    let harness = Harness::new(two_active_members(), &["a", "b"]).await;
    add_segment_with_emails(&harness, &active_members()).await;
    let sync = harness.engine.synchronizer();

    sync.sync_segment("active").await.unwrap();
    let again = sync.sync_segment("active").await.unwrap();

    match again {
        SegmentRunReport::Synced { joined, left, .. } => {
            assert!(joined.is_empty());
            assert!(left.is_empty());
        }
        other => panic!("unexpected report: {:?}", other),
    }
    assert_eq!(harness.emails.sent.lock().await.len(), 1);
    assert_eq!(harness.newsletter.changes.lock().await.len(), 1);
    assert_eq!(sync.state("active").await, RunState::Idle);
}

#[tokio::test]
async fn test_disabled_email_is_not_sent() {
    let harness = Harness::new(two_active_members(), &["a", "b"]).await;
    let segment = Segment::new("plain", "Plain", active_members().rule_group);
    harness.repository.save_segment(&segment).await.unwrap();
    harness
        .repository
        .save_ongoing_email(
            &SegmentOngoingEmail::new("plain", EmailTrigger::OnJoin, "welcome").disabled(),
        )
        .await
        .unwrap();

    let report = harness.engine.synchronizer().sync_segment("plain").await.unwrap();

    assert!(report.is_synced());
    assert!(harness.emails.sent.lock().await.is_empty());
    assert!(harness.newsletter.changes.lock().await.is_empty());
}

#[tokio::test]
async fn test_failing_sender_still_checkpoints() {
    let sender: Arc<dyn EmailSender> = Arc::new(FailingEmailSender);
    let harness = Harness::with_sender(two_active_members(), &["a", "b"], Some(sender)).await;
    add_segment_with_emails(&harness, &active_members()).await;

    let report = harness.engine.synchronizer().sync_segment("active").await.unwrap();

    match report {
        SegmentRunReport::Synced {
            joined,
            dispatch_failures,
            ..
        } => {
            assert_eq!(joined, ids(&["a", "b"]));
            assert_eq!(dispatch_failures, 1);
        }
        other => panic!("unexpected report: {:?}", other),
    }

    // Checkpoint held and the tag step still ran
    assert_eq!(harness.ledger.members("active").await.unwrap(), ids(&["a", "b"]));
    assert_eq!(harness.newsletter.changes.lock().await.len(), 1);

    // The next run sees no change, so nothing is retried
    let again = harness.engine.synchronizer().sync_segment("active").await.unwrap();
    assert!(matches!(
        again,
        SegmentRunReport::Synced { ref joined, dispatch_failures: 0, .. } if joined.is_empty()
    ));
}

#[tokio::test]
async fn test_schema_drift_is_skipped() {
    let harness = Harness::new(two_active_members(), &["a", "b"]).await;
    harness.repository.save_segment(&active_members()).await.unwrap();

    // Written straight to storage, bypassing validation
    let drifted = Segment::new(
        "drifted",
        "Big feet",
        RuleGroup::and(vec![Rule::new("shoeSize", "greater", vec![44i64.into()]).into()]),
    );
    harness.repository.save_segment(&drifted).await.unwrap();

    let reports = harness.engine.synchronizer().sync_all().await.unwrap();
    assert_eq!(reports.len(), 2);

    let drifted_report = reports
        .iter()
        .find(|r| r.segment_id() == "drifted")
        .unwrap();
    match drifted_report {
        SegmentRunReport::Skipped { reason, .. } => assert!(reason.contains("shoeSize")),
        other => panic!("unexpected report: {:?}", other),
    }
    assert!(harness.ledger.members("drifted").await.unwrap().is_empty());

    let active_report = reports.iter().find(|r| r.segment_id() == "active").unwrap();
    assert!(active_report.is_synced());

    let invalid = harness.engine.synchronizer().revalidate_segments().await.unwrap();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].segment_id, "drifted");
}

#[tokio::test]
async fn test_concurrent_runs_fire_once() {
    let harness = Harness::new(two_active_members(), &["a", "b"]).await;
    add_segment_with_emails(&harness, &active_members()).await;
    let sync = harness.engine.synchronizer();

    let (first, second) = tokio::join!(sync.sync_segment("active"), sync.sync_segment("active"));

    let joined_total: usize = [first.unwrap(), second.unwrap()]
        .iter()
        .map(|report| match report {
            SegmentRunReport::Synced { joined, .. } => joined.len(),
            _ => 0,
        })
        .sum();
    assert_eq!(joined_total, 2);
    assert_eq!(harness.emails.recipients("welcome").await.len(), 1);
}

#[tokio::test]
async fn test_unresolved_contacts_count_as_failures() {
    // "b" matches but has no directory entry
    let harness = Harness::new(two_active_members(), &["a"]).await;
    add_segment_with_emails(&harness, &active_members()).await;

    let report = harness
        .engine
        .synchronizer()
        .sync_segment("active")
        .await
        .unwrap();
    match report {
        SegmentRunReport::Synced {
            joined,
            dispatch_failures,
            ..
        } => {
            assert_eq!(joined, ids(&["a", "b"]));
            assert_eq!(dispatch_failures, 1);
        }
        other => panic!("Expected Synced, got {:?}", other),
    }

    assert_eq!(
        harness.emails.recipients("welcome").await,
        vec![vec!["a".to_string()]]
    );
    assert_eq!(
        *harness.newsletter.changes.lock().await,
        vec![(
            "members".to_string(),
            '+',
            vec!["a@example.org".to_string()]
        )]
    );
}

#[tokio::test]
async fn test_empty_directory_reports_lost_dispatch() {
    let harness = Harness::new(two_active_members(), &[]).await;
    add_segment_with_emails(&harness, &active_members()).await;
    let sync = harness.engine.synchronizer();

    let report = sync.sync_segment("active").await.unwrap();
    assert!(matches!(
        report,
        SegmentRunReport::Synced { dispatch_failures: 1, .. }
    ));
    assert!(harness.emails.sent.lock().await.is_empty());
    assert!(harness.newsletter.changes.lock().await.is_empty());
    assert_eq!(
        harness.ledger.members("active").await.unwrap(),
        ids(&["a", "b"])
    );
}

#[tokio::test]
async fn test_empty_groups() {
    let harness = Harness::new(two_active_members(), &[]).await;
    harness
        .repository
        .save_segment(&Segment::new("everyone", "Everyone", RuleGroup::and(vec![])))
        .await
        .unwrap();
    harness
        .repository
        .save_segment(&Segment::new("no-one", "No one", RuleGroup::or(vec![])))
        .await
        .unwrap();

    let reports = harness.engine.synchronizer().sync_all().await.unwrap();
    assert!(reports.iter().all(|r| r.is_synced()));

    assert_eq!(
        harness.ledger.members("everyone").await.unwrap(),
        ids(&["a", "b", "x"])
    );
    assert!(harness.ledger.members("no-one").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkpoint_failure_blocks_dispatch() {
    let repository = Arc::new(roster_repository::MemorySegmentRepository::new());
    let emails = Arc::new(RecordingEmailSender::default());

    let engine = SegmentEngineBuilder::new()
        .with_repository(repository.clone())
        .with_population(Arc::new(two_active_members()))
        .with_ledger(Arc::new(FailingLedger::default()))
        .with_directory(directory(&["a", "b"]))
        .with_email_sender(emails.clone())
        .build()
        .await
        .unwrap();

    repository.save_segment(&active_members()).await.unwrap();
    repository
        .save_ongoing_email(&SegmentOngoingEmail::new(
            "active",
            EmailTrigger::OnJoin,
            "welcome",
        ))
        .await
        .unwrap();

    let direct = engine.synchronizer().sync_segment("active").await;
    assert!(matches!(direct, Err(SdkError::Runtime(_))));

    let reports = engine.synchronizer().sync_all().await.unwrap();
    assert!(matches!(reports[0], SegmentRunReport::Failed { .. }));
    assert!(emails.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_unknown_segment() {
    let harness = Harness::new(MemoryPopulation::new(), &[]).await;
    let result = harness.engine.synchronizer().sync_segment("missing").await;
    assert!(matches!(result, Err(SdkError::Repository(_))));
    assert!(harness.repository.list_segments().await.unwrap().is_empty());
}
