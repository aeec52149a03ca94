//! # QL-04 State Sync
//!
//! Snapshot catch-up for validators that fell behind.
//!
//! **Subsystem ID:** 4  
//! **Architecture:** Hexagonal (domain + ports + service)
//!
//! ## Purpose
//!
//! A node more than `staleness_threshold` blocks behind its peers does not
//! replay blocks. It fetches the latest [`StateSnapshot`](shared_types::StateSnapshot)
//! from an up-to-date peer, recomputes the state root from the received
//! accounts and, only if it matches, replaces its ledger state atomically.
//! The round manager then fast-forwards to the snapshot height.
//!
//! ## Security
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Root recomputation | Snapshots are never applied unverified |
//! | Bounded fetch | Every request has a deadline |
//! | Peer rotation | A failed peer is followed by the next candidate |
//! | Attempt limit | After `max_attempts` the node stays an observer |
//!
//! ## Module Structure
//!
//! ```text
//! ql-04-state-sync/
//! ├── domain/      # SyncPhase, SyncOutcome, SyncError
//! ├── ports/       # SnapshotSource
//! ├── service.rs   # StateSyncService
//! └── config.rs    # SyncConfig
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::SyncConfig;
pub use domain::{SyncError, SyncOutcome, SyncPhase};
pub use ports::SnapshotSource;
pub use service::StateSyncService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
