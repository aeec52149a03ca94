//! # QL-01 Peer Registry
//!
//! Known validators, voting power and liveness.
//!
//! **Subsystem ID:** 1  
//! **Architecture:** Hexagonal (domain + service)
//!
//! ## Purpose
//!
//! - Register validators and track their stake-weighted voting power
//! - Track liveness from heartbeats and votes; expire silent validators
//! - Freeze the active validators into an arena-indexed [`VotingSet`] per height
//! - Keep an append-only fault log (equivocation, bad signatures, bad proposals)
//!
//! ## Module Structure
//!
//! ```text
//! ql-01-peer-registry/
//! ├── domain/      # PeerInfo, VotingSet, FaultEvidence, RegistryError
//! ├── config.rs    # RegistryConfig
//! └── registry.rs  # PeerRegistry
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod registry;

pub use config::RegistryConfig;
pub use domain::{
    FaultEvidence, FaultRecord, PeerInfo, PeerStats, RegistryError, ValidatorIndex, VotingSet,
};
pub use registry::{PeerRegistry, RegistryStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
