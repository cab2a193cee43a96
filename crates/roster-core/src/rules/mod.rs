//! Rule DSL
//!
//! Filters are expressed as a boolean tree of rules:
//!
//! ```json
//! {
//!   "condition": "AND",
//!   "rules": [
//!     { "field": "contributionType", "operator": "equal", "value": ["Automatic"] },
//!     {
//!       "condition": "OR",
//!       "rules": [
//!         { "field": "joined", "operator": "greater", "value": ["$now(y:-1)"] },
//!         { "field": "tags", "operator": "contains", "value": ["volunteer"] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A group with no rules is unrestricted under `AND` and matches nothing
//! under `OR`.

mod combine;
mod operator;
mod types;

pub use combine::{flatten_rules, merge_rules};
pub use operator::Operator;
pub use types::{Condition, Rule, RuleGroup, RuleNode, RuleValue, ValueType};
