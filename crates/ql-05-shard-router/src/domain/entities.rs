//! # Shard Entities

use super::{ShardError, ShardId};
use serde::{Deserialize, Serialize};
use shared_types::{Hash, Transaction};

/// Shard router configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Number of shards. Changing it is a governance action outside the router.
    pub shard_count: u16,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self { shard_count: 4 }
    }
}

impl ShardConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self { shard_count: 2 }
    }
}

/// Transactions of one shard for one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardBlock {
    /// Shard the transactions route to.
    pub shard_id: ShardId,
    /// Height of the block being assembled.
    pub height: u64,
    /// State root of the shard's accounts before this block.
    pub parent_state_root: Hash,
    /// Transactions in submission order.
    pub transactions: Vec<Transaction>,
}

/// Shard sub-blocks merged into block order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedBatch {
    /// Height of the block.
    pub height: u64,
    /// Shard ascending, submission order within a shard.
    pub transactions: Vec<Transaction>,
    /// Root of the tree over every shard's parent state root.
    pub shard_root: Hash,
}

/// Inclusion proof of one shard's state root under a block's shard root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardProof {
    /// Shard whose root is proven.
    pub shard_id: ShardId,
    /// Shard count the tree was built for; fixes the tree shape.
    pub shard_count: u16,
    /// Sibling hashes from the leaf level up.
    pub siblings: Vec<Hash>,
}

/// Whether a shard's last sub-block passed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ShardHealth {
    /// No failure since the last successful merge.
    #[default]
    Healthy,
    /// The sub-block for `height` was rejected.
    Unhealthy {
        /// Height of the rejected sub-block
        height: u64,
        /// Why it was rejected
        error: ShardError,
    },
}

impl ShardHealth {
    /// True unless the last sub-block was rejected.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Transactions routed per shard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Index = shard id.
    pub routed: Vec<u64>,
    /// Successful merges.
    pub merges: u64,
}

impl ShardStats {
    /// Total transactions routed.
    pub fn total_routed(&self) -> u64 {
        self.routed.iter().sum()
    }
}
