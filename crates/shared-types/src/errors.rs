//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors from the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Block does not extend the current head.
    #[error("Block at height {height} does not extend head at height {head}")]
    NotNextHeight { height: u64, head: u64 },

    /// Parent hash does not match the committed head.
    #[error("Parent hash mismatch at height {height}")]
    ParentMismatch { height: u64 },

    /// A transaction in the block failed to apply.
    #[error("State transition failed: {0}")]
    Transition(#[from] TransitionError),

    /// Snapshot is older than (or equal to) local state.
    #[error("Snapshot height {snapshot} is not ahead of local height {local}")]
    StaleSnapshot { snapshot: u64, local: u64 },

    /// Backing store is unavailable or refused the write.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Transaction application errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Zero-value transfers are not allowed.
    #[error("Transaction amount must be positive")]
    ZeroAmount,

    /// Signature did not verify or sender does not match key.
    #[error("Invalid transaction signature")]
    InvalidSignature,

    /// Nonce is not the next one for the sender.
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    /// Sender cannot cover the amount.
    #[error("Insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance { balance: u64, amount: u64 },

    /// Receiver balance would overflow.
    #[error("Receiver balance overflow")]
    BalanceOverflow,
}

/// Outbound network errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer's inbound queue is full; the message was dropped.
    #[error("Peer queue full")]
    QueueFull,

    /// The peer is not connected.
    #[error("Peer disconnected")]
    Disconnected,

    /// The peer is unknown to the transport.
    #[error("Unknown peer {0}")]
    UnknownPeer(String),

    /// Request did not complete in time.
    #[error("Request timed out")]
    Timeout,
}

/// Why a validator is not voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverReason {
    /// Local state is behind peers; sync in progress.
    Syncing,
    /// Sync gave up after the configured attempts.
    SyncExhausted,
    /// Local ledger refused a commit.
    StorageFailure,
    /// The local key is not in the active voting set.
    NotInValidatorSet,
}

/// Whether the local node takes part in voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    /// Normal operation: proposing and voting.
    Voting,
    /// Receiving and forwarding only.
    Observer(ObserverReason),
}

impl Participation {
    /// Whether the node may cast votes and proposals.
    pub fn is_voting(&self) -> bool {
        matches!(self, Participation::Voting)
    }
}
