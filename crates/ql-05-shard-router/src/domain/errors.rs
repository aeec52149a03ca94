//! # Domain Errors
//!
//! Error types for the Shard Router.

use thiserror::Error;

/// Shard identifier.
pub type ShardId = u16;

/// Shard router errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
    /// Shard count must be at least one.
    #[error("Invalid shard count: {0}")]
    InvalidShardCount(u16),

    /// Shard id outside the configured range.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// The same shard appears twice in one block.
    #[error("Duplicate sub-block for shard {0}")]
    DuplicateShard(ShardId),

    /// Sub-block targets another height.
    #[error("Shard {shard} sub-block for height {got}, expected {expected}")]
    WrongHeight {
        /// Shard of the sub-block
        shard: ShardId,
        /// Height being assembled
        expected: u64,
        /// Height in the sub-block
        got: u64,
    },

    /// Sub-block does not build on the shard's parent state.
    #[error("Shard {0} parent state root mismatch")]
    ParentRootMismatch(ShardId),

    /// A transaction is placed in a shard it does not route to.
    #[error("Transaction routed to shard {expected} found in shard {found}")]
    Misrouted {
        /// Shard the transaction belongs to
        expected: ShardId,
        /// Shard it was found in
        found: ShardId,
    },

    /// A transaction signature did not verify.
    #[error("Invalid transaction signature in shard {0}")]
    InvalidSignature(ShardId),

    /// Transactions are not ordered shard-ascending.
    #[error("Transactions not in shard order at index {0}")]
    OutOfOrder(usize),

    /// Shard root digest does not match the parent roots.
    #[error("Shard root mismatch")]
    ShardRootMismatch,
}
