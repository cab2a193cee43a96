//! Builder pattern for the segment engine

use roster_repository::{RepositoryConfig, WritableSegmentRepository};
use roster_runtime::{
    ContactDirectory, EmailSender, LoggingEmailSender, LoggingNewsletterProvider, MemoryLedger,
    MembershipLedger, MemoryContactDirectory, NewsletterProvider, PopulationSource,
};
use std::sync::Arc;

use crate::composer::{CalloutFormSource, ContactSchemaComposer, MemoryCalloutFormSource};
use crate::config::SyncConfig;
use crate::dispatch::SegmentDispatcher;
use crate::error::{Result, SdkError};
use crate::service::SegmentService;
use crate::sync::SegmentSynchronizer;

/// A wired synchronizer and segment service sharing one repository
pub struct SegmentEngine {
    synchronizer: Arc<SegmentSynchronizer>,
    service: SegmentService,
}

impl SegmentEngine {
    pub fn synchronizer(&self) -> Arc<SegmentSynchronizer> {
        self.synchronizer.clone()
    }

    pub fn service(&self) -> &SegmentService {
        &self.service
    }
}

/// Builder for [`SegmentEngine`]
///
/// Only the population source is required. Everything else defaults to an
/// in-memory or logging implementation.
///
/// # Example
///
/// ```rust,ignore
/// use roster_sdk::{SegmentEngineBuilder, SyncConfig};
/// use roster_repository::RepositoryConfig;
///
/// let engine = SegmentEngineBuilder::new()
///     .with_repository_config(RepositoryConfig::file_system("segments"))
///     .with_population(population)
///     .with_config(SyncConfig::default().with_concurrency(8))
///     .build()
///     .await?;
///
/// let reports = engine.synchronizer().sync_all().await?;
/// ```
#[derive(Default)]
pub struct SegmentEngineBuilder {
    config: SyncConfig,
    repository_config: Option<RepositoryConfig>,
    repository: Option<Arc<dyn WritableSegmentRepository>>,
    population: Option<Arc<dyn PopulationSource>>,
    ledger: Option<Arc<dyn MembershipLedger>>,
    directory: Option<Arc<dyn ContactDirectory>>,
    email_sender: Option<Arc<dyn EmailSender>>,
    newsletter: Option<Arc<dyn NewsletterProvider>>,
    callout_forms: Option<Arc<dyn CalloutFormSource>>,
    max_depth: Option<usize>,
}

impl SegmentEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the repository from configuration at build time
    pub fn with_repository_config(mut self, config: RepositoryConfig) -> Self {
        self.repository_config = Some(config);
        self
    }

    /// Use an already opened repository; takes precedence over a configuration
    pub fn with_repository(mut self, repository: Arc<dyn WritableSegmentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_population(mut self, population: Arc<dyn PopulationSource>) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn MembershipLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn ContactDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_email_sender(mut self, email_sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = Some(email_sender);
        self
    }

    pub fn with_newsletter(mut self, newsletter: Arc<dyn NewsletterProvider>) -> Self {
        self.newsletter = Some(newsletter);
        self
    }

    pub fn with_callout_forms(mut self, callout_forms: Arc<dyn CalloutFormSource>) -> Self {
        self.callout_forms = Some(callout_forms);
        self
    }

    /// Reject rule groups nested deeper than `max_depth`
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Build the engine
    pub async fn build(self) -> Result<SegmentEngine> {
        self.config.validate()?;

        let population = self
            .population
            .ok_or_else(|| SdkError::Config("a population source is required".to_string()))?;

        let repository = match (self.repository, self.repository_config) {
            (Some(repository), _) => repository,
            (None, Some(config)) => config.open().await?,
            (None, None) => RepositoryConfig::memory().open().await?,
        };

        let forms = self
            .callout_forms
            .unwrap_or_else(|| Arc::new(MemoryCalloutFormSource::new()));
        let mut composer = ContactSchemaComposer::new(forms);
        if let Some(max_depth) = self.max_depth {
            composer = composer.with_max_depth(max_depth);
        }
        let composer = Arc::new(composer);

        let dispatcher = SegmentDispatcher::new(
            self.directory
                .unwrap_or_else(|| Arc::new(MemoryContactDirectory::new())),
            self.email_sender
                .unwrap_or_else(|| Arc::new(LoggingEmailSender::new())),
            self.newsletter
                .unwrap_or_else(|| Arc::new(LoggingNewsletterProvider::new())),
        );

        let synchronizer = SegmentSynchronizer::new(
            repository.clone().as_reader(),
            population.clone(),
            self.ledger.unwrap_or_else(|| Arc::new(MemoryLedger::new())),
            composer.clone(),
            dispatcher,
            self.config,
        );

        tracing::info!(
            concurrency = synchronizer.config().concurrency,
            "Segment engine built"
        );

        Ok(SegmentEngine {
            synchronizer: Arc::new(synchronizer),
            service: SegmentService::new(repository, composer, population),
        })
    }
}
