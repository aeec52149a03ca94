//! Ports layer for the Round Manager

mod outbound;

pub use outbound::*;
