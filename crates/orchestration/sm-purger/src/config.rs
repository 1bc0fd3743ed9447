//! Configuration types for a delete run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on concurrent delete requests.
pub const MAX_CONCURRENCY: usize = 4096;

/// How many times each listed page is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassMode {
    /// Delete each page once, as soon as it is listed
    #[default]
    Single,

    /// Delete each page as it is listed, then again after listing completes.
    /// The second pass decides the final result.
    Double,
}

/// Configuration for a delete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    /// Maximum delete requests in flight at once
    pub concurrency: usize,

    /// Number of delete passes over the listing
    pub pass_mode: PassMode,

    /// Per-batch request deadline in seconds (0 = no deadline)
    pub batch_timeout_secs: u64,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            pass_mode: PassMode::Single,
            batch_timeout_secs: 0,
        }
    }
}

impl PurgeConfig {
    /// Create a new run configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrent delete requests, clamped to
    /// `1..=MAX_CONCURRENCY`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the pass mode.
    pub fn with_pass_mode(mut self, pass_mode: PassMode) -> Self {
        self.pass_mode = pass_mode;
        self
    }

    /// Set the per-batch deadline in seconds.
    pub fn with_batch_timeout_secs(mut self, batch_timeout_secs: u64) -> Self {
        self.batch_timeout_secs = batch_timeout_secs;
        self
    }

    /// The per-batch deadline, if one is configured.
    pub fn batch_timeout(&self) -> Option<Duration> {
        (self.batch_timeout_secs > 0).then(|| Duration::from_secs(self.batch_timeout_secs))
    }
}
