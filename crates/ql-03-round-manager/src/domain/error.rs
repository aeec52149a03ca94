//! Error types for the Round Manager

use ql_01_peer_registry::RegistryError;
use ql_02_vote_aggregation::AggregationError;
use ql_05_shard_router::ShardError;
use shared_types::{ObserverReason, Phase, StorageError, TransitionError};
use thiserror::Error;

/// Consensus error types.
///
/// Protocol violations and expired messages are never fatal: the caller
/// logs and drops the message. Only [`ConsensusError::Storage`] changes the
/// node's participation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("Invalid vote signature")]
    InvalidSignature,

    #[error("Expired message for height {height} round {round}")]
    Expired { height: u64, round: u32 },

    #[error("Message for future height {got}, current height {current}")]
    FutureHeight { current: u64, got: u64 },

    #[error("Message for round {got} too far past current round {current}")]
    FutureRound { current: u32, got: u32 },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Candidate transaction batch is empty")]
    EmptyCandidate,

    #[error("Local validator is not the proposer for height {height} round {round}")]
    NotProposer { height: u64, round: u32 },

    #[error("Already proposed in round {0}")]
    AlreadyProposed(u32),

    #[error("Operation not allowed in phase {0}")]
    WrongPhase(Phase),

    #[error("Local node is not voting: {0:?}")]
    NotVoting(ObserverReason),

    #[error("Ledger head is at height {ledger}, expected {expected}")]
    LedgerMismatch { expected: u64, ledger: u64 },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Shard error: {0}")]
    Shard(#[from] ShardError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Consensus result alias.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
