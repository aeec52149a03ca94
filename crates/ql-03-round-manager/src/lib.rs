//! # ql-03-round-manager
//!
//! Round Manager subsystem for Quorum-Ledger.
//!
//! ## Architecture
//!
//! A Tendermint-style state machine. Each height runs rounds of
//! Propose → Prevote → Precommit; a precommit quorum (strictly more than two
//! thirds of the frozen voting power, and never less than a majority of the
//! registered power) commits the block to the ledger. Proposers rotate over
//! every registered validator so that nodes with different liveness views
//! still agree on who proposes.
//!
//! ```text
//!   Network ──Proposal/Vote──→ [RoundManager] ──commit──→ [LedgerStore]
//!                                  │    ↑
//!                     broadcast ←──┘    └── tick (advance_phase)
//! ```
//!
//! ### Single Writer
//!
//! The manager is `&mut self` throughout and owned by one task. Inbound
//! messages and timer ticks are funnelled to that task; outbound messages go
//! through a non-blocking [`ConsensusBroadcaster`].
//!
//! ### Safety
//!
//! - One prevote and one precommit per round per validator
//! - A validator that precommitted a block stays locked on it until a later
//!   prevote quorum says otherwise
//! - Equivocating votes are excluded and reported to the peer registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ql_03_round_manager::{RoundConfig, RoundDependencies, RoundManager};
//!
//! let mut manager = RoundManager::new(config, keypair, registry, router, deps);
//! if manager.should_propose() {
//!     let shards = manager.prepare_candidates(mempool.pull_batch(1000).await)?;
//!     manager.propose_block(shards)?;
//! }
//! for outcome in manager.drive()? { /* ... */ }
//! ```

pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use config::RoundConfig;
pub use domain::{
    AbandonReason, ConsensusError, ConsensusResult, LockedBlock, PhaseOutcome, Round,
};
pub use ports::{
    ConsensusBroadcaster, ManualTimeSource, MempoolGateway, SystemTimeSource, TimeSource,
};
pub use service::{CommittedBlock, RoundDependencies, RoundManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
