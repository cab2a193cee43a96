//! Per-request contact schema composition
//!
//! Contact rules can reference callouts by id. The composer looks up the
//! forms of every referenced callout and merges their derived filters into
//! a copy of the static contact schema, used for one validation and then
//! dropped.

use async_trait::async_trait;
use roster_core::callout::{callout_ids_in, callout_schema_extension, compose_schema, CalloutForm};
use roster_core::{FilterEntity, FilterSchema, RuleGroup, RuleValidator, ValidatedRuleGroup};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Lookup of callout forms by callout id
#[async_trait]
pub trait CalloutFormSource: Send + Sync {
    /// The callout's form, or `None` if no such callout exists
    async fn callout_form(&self, id: Uuid) -> Result<Option<CalloutForm>>;
}

/// Callout forms held in memory
#[derive(Default)]
pub struct MemoryCalloutFormSource {
    forms: RwLock<HashMap<Uuid, CalloutForm>>,
}

impl MemoryCalloutFormSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, id: Uuid, form: CalloutForm) -> Self {
        self.forms.get_mut().insert(id, form);
        self
    }

    pub async fn insert(&self, id: Uuid, form: CalloutForm) {
        self.forms.write().await.insert(id, form);
    }
}

#[async_trait]
impl CalloutFormSource for MemoryCalloutFormSource {
    async fn callout_form(&self, id: Uuid) -> Result<Option<CalloutForm>> {
        Ok(self.forms.read().await.get(&id).cloned())
    }
}

/// Builds the contact schema a rule group is validated against
pub struct ContactSchemaComposer {
    forms: Arc<dyn CalloutFormSource>,
    validator: RuleValidator,
}

impl ContactSchemaComposer {
    pub fn new(forms: Arc<dyn CalloutFormSource>) -> Self {
        Self {
            forms,
            validator: RuleValidator::new(),
        }
    }

    /// Reject groups nested deeper than `max_depth`
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.validator = self.validator.with_max_depth(max_depth);
        self
    }

    /// Static contact schema extended with every callout `group` references
    ///
    /// Unknown callouts add nothing, so rules on them fail validation.
    pub async fn schema_for(&self, group: &RuleGroup) -> Result<FilterSchema> {
        let mut extensions = Vec::new();

        for id in callout_ids_in(group) {
            match self.forms.callout_form(id).await? {
                Some(form) => extensions.push(callout_schema_extension(id, &form)),
                None => tracing::debug!(callout_id = %id, "Referenced callout not found"),
            }
        }

        Ok(compose_schema(
            FilterEntity::Contact.schema(),
            extensions.iter(),
        ))
    }

    /// Compose the schema for `group` and validate against it
    pub async fn validate(&self, group: &RuleGroup) -> Result<ValidatedRuleGroup> {
        let schema = self.schema_for(group).await?;
        Ok(self.validator.validate_rule_group(&schema, group)?)
    }
}
