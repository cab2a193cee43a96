//! Validate stored contact rules against the filter registry
//!
//! Run with: cargo run --example validate_rules

use chrono::{TimeZone, Utc};
use roster_core::{validate_rule_group, FilterEntity, RuleGroup};
use roster_runtime::{ColumnMap, SqlAdapter};

const SAMPLES: &[(&str, &str)] = &[
    (
        "lapsed annual members",
        r#"{
            "condition": "AND",
            "rules": [
                { "field": "activeMembership", "operator": "equal", "value": [false] },
                { "field": "contributionPeriod", "operator": "equal", "value": ["annually"] },
                { "field": "membershipExpires", "operator": "between", "value": ["$now(y:-1)", "$now"] }
            ]
        }"#,
    ),
    (
        "volunteers or big donors",
        r#"{
            "condition": "OR",
            "rules": [
                { "field": "tags", "operator": "contains", "value": ["volunteer"] },
                { "field": "contributionMonthlyAmount", "operator": "greater_or_equal", "value": [25] }
            ]
        }"#,
    ),
    (
        "relative date typo",
        r#"{
            "condition": "AND",
            "rules": [
                { "field": "joined", "operator": "greater", "value": ["yesterday"] }
            ]
        }"#,
    ),
    (
        "removed field",
        r#"{
            "condition": "AND",
            "rules": [
                { "field": "legacyReferralCode", "operator": "equal", "value": ["X1"] }
            ]
        }"#,
    ),
];

fn main() -> anyhow::Result<()> {
    println!("=== Roster Rule Validation Example ===\n");

    let schema = FilterEntity::Contact.schema();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single();
    let mut adapter = SqlAdapter::new(ColumnMap::quoted(schema));
    if let Some(now) = now {
        adapter = adapter.with_now(now);
    }

    for (name, json) in SAMPLES {
        println!("{}:", name);
        let group: RuleGroup = serde_json::from_str(json)?;

        match validate_rule_group(schema, &group) {
            Ok(validated) => {
                let predicate = adapter.where_clause(&validated)?;
                println!("   WHERE {}", predicate.sql);
                println!("   params: {}\n", serde_json::to_string(&predicate.params)?);
            }
            Err(e) => println!("   rejected: {}\n", e),
        }
    }

    Ok(())
}
