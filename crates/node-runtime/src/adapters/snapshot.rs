//! # Snapshot Source Adapter
//!
//! Implements the state sync [`SnapshotSource`] port as a
//! `SnapshotRequest`/`SnapshotResponse` exchange over the peer transport.
//! Responses are matched to requests by id; the network inbound task hands
//! them over through [`NetworkSnapshotSource::complete`].

use async_trait::async_trait;
use parking_lot::Mutex;
use ql_04_state_sync::SnapshotSource;
use shared_types::{NetworkMessage, PeerTransport, StateSnapshot, TransportError, ValidatorId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Option<StateSnapshot>>>>>;

/// Snapshot fetches over the validator network.
pub struct NetworkSnapshotSource {
    transport: Arc<dyn PeerTransport>,
    pending: PendingMap,
}

/// Removes a request from the pending map when the fetch ends or is
/// cancelled by the sync deadline.
struct PendingGuard {
    id: Uuid,
    pending: PendingMap,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl NetworkSnapshotSource {
    pub fn new(transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Deliver a response. Unknown or late ids are ignored.
    pub fn complete(&self, request_id: Uuid, snapshot: Option<StateSnapshot>) {
        match self.pending.lock().remove(&request_id) {
            Some(waiter) => {
                let _ = waiter.send(snapshot);
            }
            None => debug!(%request_id, "[sync] response for unknown request"),
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl SnapshotSource for NetworkSnapshotSource {
    async fn fetch_snapshot(
        &self,
        peer: &ValidatorId,
        min_height: u64,
    ) -> Result<Option<StateSnapshot>, TransportError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);
        let _guard = PendingGuard {
            id: request_id,
            pending: Arc::clone(&self.pending),
        };

        self.transport
            .send(
                peer,
                NetworkMessage::SnapshotRequest {
                    request_id,
                    height: min_height,
                },
            )
            .await?;
        rx.await.map_err(|_| TransportError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InProcessNetwork;
    use crate::config::NetworkConfig;
    use shared_types::{AccountSet, Envelope, ValidatorKeyPair};

    #[tokio::test]
    async fn test_request_response_roundtrip() {
        let a = ValidatorKeyPair::from_seed([1; 32]).public_key();
        let b = ValidatorKeyPair::from_seed([2; 32]).public_key();
        let hub = InProcessNetwork::new(NetworkConfig::default());
        let (endpoint, _a_rx) = hub.join(a);
        let (_b_endpoint, mut b_rx) = hub.join(b);
        let source = Arc::new(NetworkSnapshotSource::new(Arc::new(endpoint)));

        let fetch = {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.fetch_snapshot(&b, 3).await })
        };

        let Envelope { from, message } = b_rx.recv().await.unwrap();
        assert_eq!(from, a);
        let NetworkMessage::SnapshotRequest { request_id, height } = message else {
            panic!("expected snapshot request");
        };
        assert_eq!(height, 3);

        let snapshot = StateSnapshot::new(5, [1; 32], AccountSet::new());
        source.complete(request_id, Some(snapshot.clone()));
        assert_eq!(fetch.await.unwrap().unwrap(), Some(snapshot));
        assert_eq!(source.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_leaves_nothing_pending() {
        let a = ValidatorKeyPair::from_seed([1; 32]).public_key();
        let b = ValidatorKeyPair::from_seed([2; 32]).public_key();
        let hub = InProcessNetwork::new(NetworkConfig::default());
        let (endpoint, _a_rx) = hub.join(a);
        let (_b_endpoint, _b_rx) = hub.join(b);
        let source = NetworkSnapshotSource::new(Arc::new(endpoint));

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            source.fetch_snapshot(&b, 1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(source.pending_requests(), 0);
    }
}
