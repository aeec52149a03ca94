//! # Integration Scenarios
//!
//! Every scenario runs a real devnet (actor, inbound and sync tasks per
//! node) on paused tokio time, so timeouts elapse instantly and runs are
//! repeatable.

#[cfg(test)]
mod support;

pub mod consensus;
pub mod faults;
pub mod sharding;
pub mod sync;
