//! Validator entries tracked by the registry

use shared_types::{Timestamp, ValidatorId};

/// Counters kept per validator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerStats {
    /// Blocks this validator proposed that were committed.
    pub blocks_proposed: u64,
    /// Votes from this validator that were counted.
    pub votes_counted: u64,
}

/// A known validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: ValidatorId,
    pub voting_power: u64,
    /// Highest height the peer has announced.
    pub last_known_height: u64,
    /// Last heartbeat or vote, local clock.
    pub last_seen: Timestamp,
    /// Currently eligible to vote.
    pub active: bool,
    /// Permanently removed from voting; kept for history.
    pub retired: bool,
    pub stats: PeerStats,
}

impl PeerInfo {
    /// Create a new, active validator entry.
    pub fn new(id: ValidatorId, voting_power: u64, now: Timestamp) -> Self {
        Self {
            id,
            voting_power,
            last_known_height: 0,
            last_seen: now,
            active: true,
            retired: false,
            stats: PeerStats::default(),
        }
    }

    /// Counts toward the voting set.
    pub fn is_voting(&self) -> bool {
        self.active && !self.retired && self.voting_power > 0
    }
}
