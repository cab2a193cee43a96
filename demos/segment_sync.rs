//! Keep an in-memory segment in step with a changing population
//!
//! Run with: cargo run --example segment_sync

use roster_core::{Condition, Rule, RuleGroup, RuleValue};
use roster_runtime::{Contact, MemoryContactDirectory, MemoryPopulation};
use roster_sdk::{
    EmailTrigger, Segment, SegmentEngineBuilder, SegmentOngoingEmail, SegmentRunReport,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_sdk=debug,roster_runtime=info".into()),
        )
        .init();

    let population = Arc::new(MemoryPopulation::from_json(
        r#"[
            { "id": "ada", "activeMembership": true, "tags": ["volunteer"] },
            { "id": "grace", "activeMembership": true, "tags": [] },
            { "id": "linus", "activeMembership": false, "tags": ["volunteer"] }
        ]"#,
    )?);
    let directory = Arc::new(MemoryContactDirectory::with_contacts(
        ["ada", "grace", "linus"]
            .iter()
            .map(|id| Contact::new(*id, format!("{}@example.org", id), *id, "Example")),
    ));

    let engine = SegmentEngineBuilder::new()
        .with_population(population.clone())
        .with_directory(directory)
        .build()
        .await?;

    let rules = RuleGroup::new(Condition::And)
        .with_rule(Rule::new(
            "activeMembership",
            "equal",
            vec![RuleValue::Bool(true)],
        ))
        .with_rule(Rule::new(
            "tags",
            "contains",
            vec![RuleValue::String("volunteer".to_string())],
        ));
    let segment = Segment::new("active-volunteers", "Active volunteers", rules)
        .with_newsletter_tag("volunteers");

    let service = engine.service();
    service.save_segment(&segment).await?;
    service
        .save_ongoing_email(&SegmentOngoingEmail::new(
            &segment.id,
            EmailTrigger::OnJoin,
            "welcome-volunteer",
        ))
        .await?;

    let synchronizer = engine.synchronizer();

    println!("=== First sweep ===");
    print_reports(&synchronizer.sync_all().await?);

    // Linus renews, Ada lapses
    population
        .set_field("linus", "activeMembership", true.into())
        .await;
    population
        .set_field("ada", "activeMembership", false.into())
        .await;

    println!("\n=== Second sweep ===");
    print_reports(&synchronizer.sync_all().await?);

    println!("\n=== Third sweep (nothing changed) ===");
    print_reports(&synchronizer.sync_all().await?);

    Ok(())
}

fn print_reports(reports: &[SegmentRunReport]) {
    for report in reports {
        match report {
            SegmentRunReport::Synced {
                segment_id,
                joined,
                left,
                dispatch_failures,
            } => println!(
                "{}: joined {:?}, left {:?}, {} dispatch failure(s)",
                segment_id, joined, left, dispatch_failures
            ),
            SegmentRunReport::Skipped { segment_id, reason } => {
                println!("{}: skipped ({})", segment_id, reason)
            }
            SegmentRunReport::Failed { segment_id, error } => {
                println!("{}: failed ({})", segment_id, error)
            }
        }
    }
}
