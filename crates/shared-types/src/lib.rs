//! # Shared Types Crate
//!
//! Domain entities, wire messages and the ledger-store contract shared by
//! every Quorum-Ledger subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here.
//! - **Hash Integrity**: blocks carry their hash; receivers recompute it.
//! - **Atomic State**: the ledger store swaps whole views, never patches them
//!   in place.

pub mod crypto;
pub mod entities;
pub mod errors;
pub mod ledger;
pub mod messages;
pub mod state;

pub use crypto::{address_from_public_key, verify_signature, ValidatorKeyPair};
pub use entities::*;
pub use errors::*;
pub use ledger::{InMemoryLedgerStore, LedgerStore, LedgerView};
pub use messages::{Envelope, NetworkMessage, PeerTransport};
pub use state::{apply_block, apply_transaction, compute_state_root, validate_transaction, AccountSet};
