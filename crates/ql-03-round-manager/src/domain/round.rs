//! # Round State
//!
//! One attempt within a height to agree on a block.

use shared_types::{Block, Hash, Phase, Timestamp, ValidatorId};

/// The active round. Owned by the round manager; one per height at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub height: u64,
    pub round: u32,
    pub phase: Phase,
    /// Deterministic proposer; `None` only with an empty voting set.
    pub proposer: Option<ValidatorId>,
    /// When the current phase times out.
    pub deadline: Timestamp,
}

impl Round {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }
}

/// Block this validator precommitted, and in which round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedBlock {
    pub round: u32,
    pub block: Block,
}

impl LockedBlock {
    pub fn hash(&self) -> Hash {
        self.block.hash
    }
}

/// Why a round ended without a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// The phase deadline passed.
    Timeout(Phase),
    /// No hash can reach quorum any more.
    NoQuorumPossible(Phase),
}

/// Result of one [`advance_phase`](crate::RoundManager::advance_phase) step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Nothing to do yet.
    Stayed,
    /// Moved to a new phase of the same round.
    Entered(Phase),
    /// A block was committed; the manager is now at `height + 1`.
    Committed { height: u64, round: u32, hash: Hash },
    /// The round ended without a commit; `next_round` has begun.
    RoundAbandoned {
        height: u64,
        round: u32,
        next_round: u32,
        reason: AbandonReason,
    },
}
