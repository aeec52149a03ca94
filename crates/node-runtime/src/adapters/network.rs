//! # In-Process Network
//!
//! A hub of bounded per-node queues implementing [`PeerTransport`] for local
//! devnets and tests.
//!
//! Sends never wait: a full queue drops the message with a warning, the same
//! way a congested peer link would. Nodes can be disconnected to simulate an
//! outage; while disconnected they neither send nor receive.

use crate::config::NetworkConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use ql_03_round_manager::ConsensusBroadcaster;
use shared_types::{short_id, Envelope, NetworkMessage, PeerTransport, TransportError, ValidatorId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct PeerSlot {
    queue: mpsc::Sender<Envelope>,
    connected: bool,
}

/// Message hub shared by every node of one process.
pub struct InProcessNetwork {
    config: NetworkConfig,
    peers: RwLock<HashMap<ValidatorId, PeerSlot>>,
}

impl InProcessNetwork {
    pub fn new(config: NetworkConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            peers: RwLock::new(HashMap::new()),
        })
    }

    /// Attach a node. Returns its endpoint and inbound queue.
    ///
    /// Joining again replaces the previous queue.
    pub fn join(self: &Arc<Self>, id: ValidatorId) -> (NetworkEndpoint, mpsc::Receiver<Envelope>) {
        let (queue, inbox) = mpsc::channel(self.config.queue_capacity);
        self.peers.write().insert(
            id,
            PeerSlot {
                queue,
                connected: true,
            },
        );
        debug!(peer = %short_id(&id), "[network] node joined");
        let endpoint = NetworkEndpoint {
            id,
            hub: Arc::clone(self),
        };
        (endpoint, inbox)
    }

    /// Cut a node off the network.
    pub fn disconnect(&self, id: &ValidatorId) {
        if let Some(slot) = self.peers.write().get_mut(id) {
            slot.connected = false;
            debug!(peer = %short_id(id), "[network] node disconnected");
        }
    }

    /// Reattach a disconnected node.
    pub fn reconnect(&self, id: &ValidatorId) {
        if let Some(slot) = self.peers.write().get_mut(id) {
            slot.connected = true;
            debug!(peer = %short_id(id), "[network] node reconnected");
        }
    }

    pub fn is_connected(&self, id: &ValidatorId) -> bool {
        self.peers.read().get(id).is_some_and(|slot| slot.connected)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }

    fn send_from(
        &self,
        from: &ValidatorId,
        to: &ValidatorId,
        message: NetworkMessage,
    ) -> Result<(), TransportError> {
        let peers = self.peers.read();
        if !peers.get(from).is_some_and(|slot| slot.connected) {
            return Err(TransportError::Disconnected);
        }
        let slot = peers
            .get(to)
            .ok_or_else(|| TransportError::UnknownPeer(short_id(to)))?;
        if !slot.connected {
            return Err(TransportError::Disconnected);
        }
        push(slot, *from, to, message)
    }

    fn broadcast_from(&self, from: &ValidatorId, message: NetworkMessage) -> Result<(), TransportError> {
        let peers = self.peers.read();
        if !peers.get(from).is_some_and(|slot| slot.connected) {
            return Err(TransportError::Disconnected);
        }
        for (to, slot) in peers.iter() {
            if to == from || !slot.connected {
                continue;
            }
            // One congested peer must not stop delivery to the others.
            let _ = push(slot, *from, to, message.clone());
        }
        Ok(())
    }
}

fn push(
    slot: &PeerSlot,
    from: ValidatorId,
    to: &ValidatorId,
    message: NetworkMessage,
) -> Result<(), TransportError> {
    let kind = message.kind();
    slot.queue
        .try_send(Envelope { from, message })
        .map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(peer = %short_id(to), kind, "[network] peer queue full, dropping message");
                TransportError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => TransportError::Disconnected,
        })
}

/// One node's handle on the hub.
#[derive(Clone)]
pub struct NetworkEndpoint {
    id: ValidatorId,
    hub: Arc<InProcessNetwork>,
}

impl NetworkEndpoint {
    pub fn id(&self) -> ValidatorId {
        self.id
    }
}

#[async_trait]
impl PeerTransport for NetworkEndpoint {
    async fn send(&self, to: &ValidatorId, message: NetworkMessage) -> Result<(), TransportError> {
        self.hub.send_from(&self.id, to, message)
    }

    async fn broadcast(&self, message: NetworkMessage) -> Result<(), TransportError> {
        self.hub.broadcast_from(&self.id, message)
    }
}

impl ConsensusBroadcaster for NetworkEndpoint {
    fn broadcast(&self, message: NetworkMessage) {
        let kind = message.kind();
        if let Err(e) = self.hub.broadcast_from(&self.id, message) {
            debug!(kind, error = %e, "[network] broadcast dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ValidatorKeyPair;

    fn id(seed: u8) -> ValidatorId {
        ValidatorKeyPair::from_seed([seed; 32]).public_key()
    }

    fn heartbeat(height: u64) -> NetworkMessage {
        NetworkMessage::PeerHeartbeat {
            height,
            voter_id: id(1),
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let hub = InProcessNetwork::new(NetworkConfig::default());
        let (a, mut a_rx) = hub.join(id(1));
        let (_b, mut b_rx) = hub.join(id(2));
        let (_c, mut c_rx) = hub.join(id(3));

        PeerTransport::broadcast(&a, heartbeat(4)).await.unwrap();

        assert_eq!(b_rx.recv().await.unwrap().from, id(1));
        assert_eq!(c_rx.recv().await.unwrap().message, heartbeat(4));
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let hub = InProcessNetwork::new(NetworkConfig { queue_capacity: 1 });
        let (a, _a_rx) = hub.join(id(1));
        let (_b, mut b_rx) = hub.join(id(2));

        a.send(&id(2), heartbeat(1)).await.unwrap();
        assert_eq!(a.send(&id(2), heartbeat(2)).await, Err(TransportError::QueueFull));
        assert_eq!(b_rx.recv().await.unwrap().message, heartbeat(1));
    }

    #[tokio::test]
    async fn test_disconnected_node_is_isolated() {
        let hub = InProcessNetwork::new(NetworkConfig::default());
        let (a, mut a_rx) = hub.join(id(1));
        let (b, mut b_rx) = hub.join(id(2));

        hub.disconnect(&id(2));
        assert!(!hub.is_connected(&id(2)));
        assert_eq!(a.send(&id(2), heartbeat(1)).await, Err(TransportError::Disconnected));
        assert_eq!(
            PeerTransport::broadcast(&b, heartbeat(1)).await,
            Err(TransportError::Disconnected)
        );
        ConsensusBroadcaster::broadcast(&a, heartbeat(2));
        assert!(b_rx.try_recv().is_err());
        assert!(a_rx.try_recv().is_err());

        hub.reconnect(&id(2));
        b.send(&id(1), heartbeat(3)).await.unwrap();
        assert_eq!(a_rx.recv().await.unwrap().message, heartbeat(3));
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        let hub = InProcessNetwork::new(NetworkConfig::default());
        let (a, _rx) = hub.join(id(1));
        assert!(matches!(
            a.send(&id(9), heartbeat(0)).await,
            Err(TransportError::UnknownPeer(_))
        ));
    }
}
