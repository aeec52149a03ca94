//! # Sync Entities

use shared_types::Hash;
use std::fmt;

/// Where the sync state machine is.
///
/// ```text
/// Idle → RequestingSnapshot → VerifyingSnapshot → ApplyingSnapshot → Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    RequestingSnapshot,
    VerifyingSnapshot,
    ApplyingSnapshot,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RequestingSnapshot => "requesting",
            Self::VerifyingSnapshot => "verifying",
            Self::ApplyingSnapshot => "applying",
        };
        f.write_str(name)
    }
}

/// Result of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Ledger restored to `height`; consensus may fast-forward.
    CaughtUp { height: u64, block_hash: Hash },
    /// Every attempt failed; the node stays an observer.
    Exhausted { attempts: u32 },
    /// No peer is far enough ahead.
    NotNeeded,
}
