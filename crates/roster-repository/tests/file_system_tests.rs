//! Integration tests for FileSystemSegmentRepository

use roster_core::{Rule, RuleGroup};
use roster_repository::{
    EmailTrigger, FileSystemSegmentRepository, RepositoryError, Segment, SegmentOngoingEmail,
    SegmentRepository, WritableSegmentRepository,
};
use tempfile::TempDir;
use tokio::fs;

async fn create_test_repo() -> (TempDir, FileSystemSegmentRepository) {
    let temp_dir = TempDir::new().unwrap();
    let repo = FileSystemSegmentRepository::create(temp_dir.path())
        .await
        .unwrap();
    (temp_dir, repo)
}

fn active_members() -> Segment {
    Segment::new(
        "active-members",
        "Active members",
        RuleGroup::and(vec![
            Rule::new("activeMembership", "equal", vec![true.into()]).into()
        ]),
    )
    .with_description("Everyone with a current membership")
    .with_newsletter_tag("members")
}

#[tokio::test]
async fn test_save_and_load_segment() {
    let (_temp, repo) = create_test_repo().await;
    let segment = active_members();

    repo.save_segment(&segment).await.unwrap();

    let loaded = repo.load_segment("active-members").await.unwrap();
    assert_eq!(loaded, segment);
    assert!(repo
        .root_path()
        .join("segments/active-members.yaml")
        .exists());
}

#[tokio::test]
async fn test_load_hand_written_yaml() {
    let (temp, repo) = create_test_repo().await;

    let content = r#"id: recent
name: Recent joiners
order: 2
ruleGroup:
  condition: AND
  rules:
    - field: joined
      operator: greater
      value: ["$now(M:-1)"]
    - condition: OR
      rules:
        - field: contributionType
          operator: equal
          value: ["Automatic"]
        - field: contributionType
          operator: equal
          value: ["Gift"]
"#;
    fs::write(temp.path().join("segments/recent.yaml"), content)
        .await
        .unwrap();

    let segment = repo.load_segment("recent").await.unwrap();
    assert_eq!(segment.order, 2);
    assert_eq!(segment.description, "");
    assert_eq!(segment.rule_group.flatten().len(), 3);
    assert!(segment.newsletter_tag.is_none());
}

#[tokio::test]
async fn test_list_skips_broken_files() {
    let (temp, repo) = create_test_repo().await;
    repo.save_segment(&active_members()).await.unwrap();
    repo.save_segment(&Segment::new("all", "All", RuleGroup::and(vec![])).with_order(-1))
        .await
        .unwrap();

    fs::write(temp.path().join("segments/broken.yaml"), "not: [a segment")
        .await
        .unwrap();
    fs::write(temp.path().join("segments/notes.txt"), "ignored")
        .await
        .unwrap();

    let ids: Vec<String> = repo
        .list_segments()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["all", "active-members"]);
}

#[tokio::test]
async fn test_missing_and_invalid_ids() {
    let (_temp, repo) = create_test_repo().await;

    assert!(matches!(
        repo.load_segment("missing").await,
        Err(RepositoryError::NotFound { .. })
    ));
    assert!(matches!(
        repo.load_segment("../secrets").await,
        Err(RepositoryError::InvalidId { .. })
    ));
    assert!(!repo.exists("missing").await.unwrap());
}

#[tokio::test]
async fn test_ongoing_emails_persist() {
    let (temp, repo) = create_test_repo().await;
    repo.save_segment(&active_members()).await.unwrap();

    repo.save_ongoing_email(&SegmentOngoingEmail::new(
        "active-members",
        EmailTrigger::OnJoin,
        "welcome",
    ))
    .await
    .unwrap();
    repo.save_ongoing_email(
        &SegmentOngoingEmail::new("active-members", EmailTrigger::OnLeave, "goodbye").disabled(),
    )
    .await
    .unwrap();

    // A fresh handle reads the same files
    let reopened = FileSystemSegmentRepository::new(temp.path()).unwrap();
    let emails = reopened.ongoing_emails("active-members").await.unwrap();
    assert_eq!(emails.len(), 2);
    assert!(emails
        .iter()
        .any(|e| e.trigger == EmailTrigger::OnLeave && !e.enabled));

    assert!(reopened.delete_segment("active-members").await.unwrap());
    assert!(reopened
        .ongoing_emails("active-members")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_email_for_unknown_segment_is_rejected() {
    let (_temp, repo) = create_test_repo().await;
    let result = repo
        .save_ongoing_email(&SegmentOngoingEmail::new(
            "ghost",
            EmailTrigger::OnJoin,
            "welcome",
        ))
        .await;
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

#[test]
fn test_new_requires_existing_directory() {
    let temp = TempDir::new().unwrap();
    let result = FileSystemSegmentRepository::new(temp.path().join("absent"));
    assert!(matches!(result, Err(RepositoryError::InvalidPath { .. })));
}
