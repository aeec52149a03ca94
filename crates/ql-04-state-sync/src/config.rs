//! # State Sync Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// State sync configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// A peer must be more than this many blocks ahead before syncing from it.
    /// Smaller gaps are closed by ordinary consensus catch-up.
    pub staleness_threshold: u64,
    /// Failed fetches tolerated before giving up.
    pub max_attempts: u32,
    /// Deadline for one snapshot fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: 1,
            max_attempts: 3,
            fetch_timeout_ms: 5_000,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (short fetch deadline).
    pub fn for_testing() -> Self {
        Self {
            staleness_threshold: 1,
            max_attempts: 3,
            fetch_timeout_ms: 200,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
