//! # Peer Messages
//!
//! Transport-agnostic messages exchanged between validators and the
//! [`PeerTransport`] contract that carries them.

use crate::entities::{Block, StateSnapshot, ValidatorId, Vote};
use crate::errors::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages on the validator network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMessage {
    /// A proposed block for `(height, round)`.
    Proposal {
        height: u64,
        round: u32,
        block: Block,
    },
    /// A prevote or precommit.
    Vote(Vote),
    /// Ask a peer for its latest snapshot at or above `height`.
    SnapshotRequest { request_id: Uuid, height: u64 },
    /// Reply to a `SnapshotRequest`; `None` if the peer has nothing that high.
    SnapshotResponse {
        request_id: Uuid,
        snapshot: Option<StateSnapshot>,
    },
    /// Liveness and height announcement.
    PeerHeartbeat { height: u64, voter_id: ValidatorId },
}

impl NetworkMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkMessage::Proposal { .. } => "proposal",
            NetworkMessage::Vote(_) => "vote",
            NetworkMessage::SnapshotRequest { .. } => "snapshot_request",
            NetworkMessage::SnapshotResponse { .. } => "snapshot_response",
            NetworkMessage::PeerHeartbeat { .. } => "heartbeat",
        }
    }
}

/// A message together with the validator that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sending validator.
    pub from: ValidatorId,
    /// Payload.
    pub message: NetworkMessage,
}

/// Peer transport port.
///
/// Implementations must not block the caller on a slow peer: a full peer
/// queue is reported as [`TransportError::QueueFull`] and the message dropped.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send to one peer.
    async fn send(&self, to: &ValidatorId, message: NetworkMessage) -> Result<(), TransportError>;

    /// Send to every connected peer except the local node.
    async fn broadcast(&self, message: NetworkMessage) -> Result<(), TransportError>;
}
