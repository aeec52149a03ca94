//! # Consensus Metrics
//!
//! Prometheus metrics for monitoring rounds and commits.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ql-03-round-manager = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_blocks_committed_total` - Blocks committed
//! - `consensus_rounds_abandoned_total` - Rounds ended without a commit
//! - `consensus_equivocations_total` - Conflicting votes detected
//! - `consensus_votes_rejected_total` - Rejected votes (by reason)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks committed
    pub static ref BLOCKS_COMMITTED: IntCounter = register_int_counter!(
        "consensus_blocks_committed_total",
        "Total number of blocks committed"
    )
    .expect("Failed to create BLOCKS_COMMITTED metric");

    /// Total rounds abandoned without a commit
    pub static ref ROUNDS_ABANDONED: IntCounter = register_int_counter!(
        "consensus_rounds_abandoned_total",
        "Total number of rounds abandoned"
    )
    .expect("Failed to create ROUNDS_ABANDONED metric");

    /// Total equivocations detected
    pub static ref EQUIVOCATIONS: IntCounter = register_int_counter!(
        "consensus_equivocations_total",
        "Total number of equivocating votes detected"
    )
    .expect("Failed to create EQUIVOCATIONS metric");

    /// Total votes rejected, labeled by reason
    pub static ref VOTES_REJECTED: CounterVec = register_counter_vec!(
        "consensus_votes_rejected_total",
        "Total number of votes rejected",
        &["reason"]
    )
    .expect("Failed to create VOTES_REJECTED metric");
}

/// Record a committed block
#[cfg(feature = "metrics")]
pub fn record_block_committed() {
    BLOCKS_COMMITTED.inc();
}

/// Record an abandoned round
#[cfg(feature = "metrics")]
pub fn record_round_abandoned() {
    ROUNDS_ABANDONED.inc();
}

/// Record an equivocation
#[cfg(feature = "metrics")]
pub fn record_equivocation() {
    EQUIVOCATIONS.inc();
}

/// Record a rejected vote with reason
#[cfg(feature = "metrics")]
pub fn record_vote_rejected(reason: &str) {
    VOTES_REJECTED.with_label_values(&[reason]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_block_committed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_abandoned() {}

#[cfg(not(feature = "metrics"))]
pub fn record_equivocation() {}

#[cfg(not(feature = "metrics"))]
pub fn record_vote_rejected(_reason: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_block_committed();
        record_round_abandoned();
        record_equivocation();
        record_vote_rejected("test");
    }
}
