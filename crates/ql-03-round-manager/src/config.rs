//! # Round Configuration

use serde::{Deserialize, Serialize};
use shared_types::Phase;

/// Round manager configuration. All durations in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Base wait for the round's proposal.
    pub propose_timeout_ms: u64,
    /// Base wait for a prevote quorum.
    pub prevote_timeout_ms: u64,
    /// Base wait for a precommit quorum.
    pub precommit_timeout_ms: u64,
    /// Added to every phase timeout per round number.
    pub timeout_delta_ms: u64,
    /// Maximum transactions in one block.
    pub max_block_txs: usize,
    /// Older rounds of the current height kept in the tallies.
    pub retained_rounds: u32,
    /// Later rounds of the current height accepted into the tallies.
    pub max_future_rounds: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            propose_timeout_ms: 3_000,
            prevote_timeout_ms: 1_000,
            precommit_timeout_ms: 1_000,
            timeout_delta_ms: 500,
            max_block_txs: 1_000,
            retained_rounds: 4,
            max_future_rounds: 8,
        }
    }
}

impl RoundConfig {
    /// Create a config for testing (short timeouts).
    pub fn for_testing() -> Self {
        Self {
            propose_timeout_ms: 300,
            prevote_timeout_ms: 200,
            precommit_timeout_ms: 200,
            timeout_delta_ms: 100,
            max_block_txs: 100,
            retained_rounds: 4,
            max_future_rounds: 8,
        }
    }

    /// Deadline length for `phase` in `round`: base plus `delta * round`.
    pub fn timeout(&self, phase: Phase, round: u32) -> u64 {
        let base = match phase {
            Phase::Propose => self.propose_timeout_ms,
            Phase::Prevote => self.prevote_timeout_ms,
            Phase::Precommit | Phase::Commit => self.precommit_timeout_ms,
        };
        base.saturating_add(self.timeout_delta_ms.saturating_mul(round as u64))
    }
}
