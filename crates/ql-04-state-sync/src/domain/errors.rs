//! Error types for State Sync

use shared_types::{StorageError, TransportError};
use thiserror::Error;

/// Sync errors. Every variant except [`SyncError::NoCandidates`] counts as
/// one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("No peer is far enough ahead to sync from")]
    NoCandidates,

    #[error("Snapshot fetch timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Peer has no snapshot")]
    NoSnapshot,

    #[error("Snapshot at height {got} is below required height {min}")]
    TooOld { got: u64, min: u64 },

    #[error("Snapshot root mismatch at height {height}")]
    RootMismatch { height: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Whether the peer answered with something that contradicts the height
    /// it announced. Timeouts and transport errors say nothing about the
    /// peer's honesty.
    pub fn discredits_peer(&self) -> bool {
        matches!(
            self,
            Self::NoSnapshot | Self::TooOld { .. } | Self::RootMismatch { .. }
        )
    }
}
