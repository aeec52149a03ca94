//! # Registry Configuration

use serde::{Deserialize, Serialize};

/// Peer registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Smallest voting power a validator may register with.
    pub min_voting_power: u64,
    /// Milliseconds without heartbeat or vote before a validator stops voting.
    pub liveness_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_voting_power: 1,
            liveness_timeout_ms: 30_000,
        }
    }
}

impl RegistryConfig {
    /// Create a config for testing (short liveness window).
    pub fn for_testing() -> Self {
        Self {
            min_voting_power: 1,
            liveness_timeout_ms: 2_000,
        }
    }
}
