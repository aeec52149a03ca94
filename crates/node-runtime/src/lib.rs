//! # Quorum-Ledger Node Runtime
//!
//! Runs validators built from the subsystem crates.
//!
//! ## Modular Structure
//!
//! - `actor` - Single-writer consensus actor per node
//! - `adapters` - In-process network, mempool, snapshot fetches, tokio clock
//! - `config` - `NodeConfig` from TOML and `QL_*` environment overrides
//! - `genesis` - Deterministic devnet genesis
//! - `node` - Per-validator wiring and the in-process [`Devnet`]
//!
//! ## Subsystems
//!
//! 1. Peer Registry (ql-01) - Validator set and liveness
//! 2. Vote Aggregation (ql-02) - Per-round tallies and certificates
//! 3. Round Manager (ql-03) - Propose, prevote, precommit, commit
//! 4. State Sync (ql-04) - Verified snapshot catch-up
//! 5. Shard Router (ql-05) - Parallel per-shard validation

pub mod actor;
pub mod adapters;
pub mod config;
pub mod genesis;
pub mod node;

pub use actor::{ActorInput, ConsensusActor, NodeStatus};
pub use config::{ConfigError, NodeConfig};
pub use genesis::DevnetGenesis;
pub use node::{Devnet, NodeError, ValidatorNode};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
