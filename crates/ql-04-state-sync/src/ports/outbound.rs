//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_types::{StateSnapshot, TransportError, ValidatorId};

/// Source of snapshots from peers.
///
/// The node runtime implements this over the peer transport with a
/// `SnapshotRequest`/`SnapshotResponse` exchange.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Latest snapshot of `peer` at or above `min_height`, or `None` if the
    /// peer has none.
    async fn fetch_snapshot(
        &self,
        peer: &ValidatorId,
        min_height: u64,
    ) -> Result<Option<StateSnapshot>, TransportError>;
}
