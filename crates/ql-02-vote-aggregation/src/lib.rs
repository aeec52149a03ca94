//! # QL-02 Vote Aggregation
//!
//! Collects prevotes and precommits per `(height, round, kind)` and decides
//! quorum.
//!
//! **Subsystem ID:** 2  
//! **Architecture:** Hexagonal (domain + service)
//!
//! ## Verdicts
//!
//! | Verdict | Meaning |
//! |---------|---------|
//! | `Pending` | Quorum still reachable |
//! | `QuorumReached(hash)` | Counted power for `hash` is strictly above 2/3 |
//! | `NoQuorumPossible` | Leader plus unspent power is below quorum |
//!
//! `NoQuorumPossible` never fires while any hash can still reach quorum.
//! Equivocating validators are excluded from every hash of the phase.

#![warn(clippy::all)]

pub mod aggregator;
pub mod domain;

pub use aggregator::{AggregatorStats, VoteAggregator};
pub use domain::{AggregationError, PhaseTally, TallyVerdict, VoteOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
