//! Configuration types for the segment synchronizer

use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Segments processed concurrently during a sweep
    pub concurrency: usize,

    /// Seconds between sweeps when run on an interval
    pub interval_secs: u64,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SdkError::Config(
                "sync.concurrency must be at least 1".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(SdkError::Config(
                "sync.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            interval_secs: 3600,
        }
    }
}
