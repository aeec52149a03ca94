//! # Shard Router
//!
//! Partitions candidate transactions by shard and merges shard sub-blocks
//! back into block order.
//!
//! Sub-block validation is independent per shard and runs on the rayon pool;
//! the merge itself is serial. Each validation result updates that shard's
//! [`ShardHealth`].

use crate::algorithms::{assign_shard, compute_shard_root, shard_root_proof};
use crate::domain::{
    MergedBatch, ShardBlock, ShardConfig, ShardError, ShardHealth, ShardId, ShardProof,
    ShardStats,
};
use rayon::prelude::*;
use shared_types::{Hash, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Transactions grouped by shard, submission order kept within each shard.
pub type ShardPartition = BTreeMap<ShardId, Vec<Transaction>>;

/// Routes transactions to shards for the configured shard count.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    config: ShardConfig,
    stats: ShardStats,
    health: Vec<ShardHealth>,
}

impl ShardRouter {
    /// Create a router. A shard count of zero is rejected.
    pub fn new(config: ShardConfig) -> Result<Self, ShardError> {
        if config.shard_count == 0 {
            return Err(ShardError::InvalidShardCount(0));
        }
        let stats = ShardStats {
            routed: vec![0; config.shard_count as usize],
            merges: 0,
        };
        let health = vec![ShardHealth::Healthy; config.shard_count as usize];
        Ok(Self {
            config,
            stats,
            health,
        })
    }

    /// Configured shard count.
    pub fn shard_count(&self) -> u16 {
        self.config.shard_count
    }

    /// Routing statistics.
    pub fn stats(&self) -> &ShardStats {
        &self.stats
    }

    /// Validation health of `shard`, `None` when out of range.
    pub fn health(&self, shard: ShardId) -> Option<&ShardHealth> {
        self.health.get(shard as usize)
    }

    /// Shards whose last sub-block was rejected.
    pub fn unhealthy_shards(&self) -> Vec<ShardId> {
        self.health
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_healthy())
            .map(|(shard, _)| shard as ShardId)
            .collect()
    }

    /// Prove `shard`'s parent root under the shard root of `parent_roots`.
    pub fn prove_shard(
        &self,
        parent_roots: &[Hash],
        shard: ShardId,
    ) -> Result<ShardProof, ShardError> {
        self.check_parent_roots(parent_roots)?;
        shard_root_proof(parent_roots, shard).ok_or(ShardError::UnknownShard(shard))
    }

    /// Shard of a transaction, from its sender address.
    pub fn assign(&self, tx: &Transaction) -> ShardId {
        assign_shard(tx.shard_key(), self.config.shard_count)
    }

    /// Group `txs` by shard.
    pub fn partition(&mut self, txs: Vec<Transaction>) -> ShardPartition {
        let mut partition = ShardPartition::new();
        for tx in txs {
            let shard = self.assign(&tx);
            if let Some(count) = self.stats.routed.get_mut(shard as usize) {
                *count += 1;
            }
            partition.entry(shard).or_default().push(tx);
        }
        partition
    }

    /// Wrap each shard's transactions in a sub-block for `height`.
    pub fn build_shard_blocks(
        &self,
        partition: ShardPartition,
        height: u64,
        parent_roots: &[Hash],
    ) -> Result<Vec<ShardBlock>, ShardError> {
        partition
            .into_iter()
            .map(|(shard_id, transactions)| -> Result<ShardBlock, ShardError> {
                let parent_state_root = *parent_roots
                    .get(shard_id as usize)
                    .ok_or(ShardError::UnknownShard(shard_id))?;
                Ok(ShardBlock {
                    shard_id,
                    height,
                    parent_state_root,
                    transactions,
                })
            })
            .collect()
    }

    /// Validate sub-blocks in parallel and assemble them in shard order.
    pub fn merge_shard_blocks(
        &mut self,
        blocks: Vec<ShardBlock>,
        height: u64,
        parent_roots: &[Hash],
    ) -> Result<MergedBatch, ShardError> {
        self.check_parent_roots(parent_roots)?;

        let results: Vec<(ShardId, Result<(), ShardError>)> = blocks
            .par_iter()
            .map(|block| {
                let result = self.validate_shard_block(block, height, parent_roots);
                (block.shard_id, result)
            })
            .collect();
        let mut rejected = None;
        for (shard, result) in results {
            match result {
                Ok(()) => self.mark_healthy(shard),
                Err(e) => {
                    self.mark_unhealthy(shard, height, e.clone());
                    rejected.get_or_insert(e);
                }
            }
        }
        if let Some(e) = rejected {
            return Err(e);
        }

        let mut by_shard: BTreeMap<ShardId, ShardBlock> = BTreeMap::new();
        for block in blocks {
            let shard = block.shard_id;
            if by_shard.insert(shard, block).is_some() {
                return Err(ShardError::DuplicateShard(shard));
            }
        }

        let transactions: Vec<Transaction> = by_shard
            .into_values()
            .flat_map(|block| block.transactions)
            .collect();
        self.stats.merges += 1;
        debug!(height, txs = transactions.len(), "[shard] merged shard blocks");

        Ok(MergedBatch {
            height,
            transactions,
            shard_root: compute_shard_root(parent_roots),
        })
    }

    /// Re-derive the shard layout of a received block's transactions.
    pub fn verify_layout(
        &self,
        txs: &[Transaction],
        parent_roots: &[Hash],
        shard_root: &Hash,
    ) -> Result<(), ShardError> {
        self.check_parent_roots(parent_roots)?;
        if compute_shard_root(parent_roots) != *shard_root {
            return Err(ShardError::ShardRootMismatch);
        }

        let mut previous: ShardId = 0;
        for (i, tx) in txs.iter().enumerate() {
            let shard = self.assign(tx);
            if shard < previous {
                return Err(ShardError::OutOfOrder(i));
            }
            previous = shard;
        }
        Ok(())
    }

    fn mark_healthy(&mut self, shard: ShardId) {
        if let Some(health) = self.health.get_mut(shard as usize) {
            if !health.is_healthy() {
                info!(shard, "[shard] shard healthy again");
            }
            *health = ShardHealth::Healthy;
        }
    }

    fn mark_unhealthy(&mut self, shard: ShardId, height: u64, error: ShardError) {
        if let Some(health) = self.health.get_mut(shard as usize) {
            warn!(shard, height, %error, "[shard] shard marked unhealthy");
            *health = ShardHealth::Unhealthy { height, error };
        }
    }

    fn check_parent_roots(&self, parent_roots: &[Hash]) -> Result<(), ShardError> {
        if parent_roots.len() != self.config.shard_count as usize {
            return Err(ShardError::InvalidShardCount(parent_roots.len() as u16));
        }
        Ok(())
    }

    fn validate_shard_block(
        &self,
        block: &ShardBlock,
        height: u64,
        parent_roots: &[Hash],
    ) -> Result<(), ShardError> {
        let shard = block.shard_id;
        let parent = parent_roots
            .get(shard as usize)
            .ok_or(ShardError::UnknownShard(shard))?;
        if block.height != height {
            return Err(ShardError::WrongHeight {
                shard,
                expected: height,
                got: block.height,
            });
        }
        if block.parent_state_root != *parent {
            return Err(ShardError::ParentRootMismatch(shard));
        }
        for tx in &block.transactions {
            let expected = self.assign(tx);
            if expected != shard {
                return Err(ShardError::Misrouted {
                    expected,
                    found: shard,
                });
            }
            if !tx.verify() {
                return Err(ShardError::InvalidSignature(shard));
            }
        }
        Ok(())
    }
}
