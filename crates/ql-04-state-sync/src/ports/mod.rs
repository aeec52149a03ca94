//! Ports layer for State Sync

mod outbound;

pub use outbound::*;
