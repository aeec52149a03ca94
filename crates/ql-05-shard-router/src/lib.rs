//! # QL-05 Shard Router
//!
//! Deterministic transaction-to-shard routing and shard block merge.
//!
//! **Subsystem ID:** 5  
//! **Architecture:** Hexagonal (domain + algorithms + service)
//!
//! ## Purpose
//!
//! - `assign`: pure function of the sender address, identical on every node
//! - `partition` / `build_shard_blocks`: proposal input per shard
//! - `merge_shard_blocks`: parallel validation, serial merge in shard order
//! - `verify_layout`: re-derive the layout of a received block
//! - `prove_shard` / `verify_shard_proof`: one shard's state root against a
//!   block's shard root
//! - `health`: whether a shard's last sub-block passed validation
//!
//! ## Module Structure
//!
//! ```text
//! ql-05-shard-router/
//! ├── domain/          # ShardBlock, MergedBatch, ShardProof, ShardHealth, ShardError
//! ├── algorithms/      # assign_shard, shard_state_roots, shard root tree and proofs
//! └── router.rs        # ShardRouter
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;
pub mod router;

// Re-exports
pub use algorithms::{
    assign_shard, compute_shard_root, shard_root_proof, shard_state_roots, verify_shard_proof,
};
pub use domain::{
    MergedBatch, ShardBlock, ShardConfig, ShardError, ShardHealth, ShardId, ShardProof,
    ShardStats,
};
pub use router::{ShardPartition, ShardRouter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
