//! # Voting Set
//!
//! Arena-indexed snapshot of the active validators for one height.
//!
//! Members are sorted by id so every node that sees the same active set
//! derives the same indices, the same quorum and the same proposer.
//!
//! Quorum is strictly more than two thirds of the active power, and never
//! less than a majority of the registered (non-retired) power. A node cut
//! off from the network expires its peers, but its shrunken set still needs
//! a registered majority, so it cannot commit on its own.

use shared_types::ValidatorId;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Position of a validator inside a [`VotingSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorIndex(pub usize);

/// Frozen validator set with voting power.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VotingSet {
    members: Vec<(ValidatorId, u64)>,
    lookup: HashMap<ValidatorId, ValidatorIndex>,
    total_power: u64,
    registered_power: u64,
}

impl VotingSet {
    /// Build from `(id, power)` pairs. Zero-power entries are dropped.
    pub fn new(mut members: Vec<(ValidatorId, u64)>) -> Self {
        members.retain(|(_, power)| *power > 0);
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members.dedup_by(|a, b| a.0 == b.0);
        let lookup = members
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, ValidatorIndex(i)))
            .collect();
        let total_power = members.iter().map(|(_, power)| *power).sum();
        Self {
            members,
            lookup,
            total_power,
            registered_power: total_power,
        }
    }

    /// Build with the power of every registered validator, active or not,
    /// as the floor reference for [`quorum`](Self::quorum).
    pub fn with_registered_power(members: Vec<(ValidatorId, u64)>, registered_power: u64) -> Self {
        let mut set = Self::new(members);
        set.registered_power = registered_power.max(set.total_power);
        set
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sum of all members' power.
    pub fn total_power(&self) -> u64 {
        self.total_power
    }

    /// Power of every non-retired validator when the set was frozen.
    pub fn registered_power(&self) -> u64 {
        self.registered_power
    }

    /// Minimum power strictly above two thirds of the active total, floored
    /// at a majority of the registered power.
    pub fn quorum(&self) -> u64 {
        let two_thirds = (2 * self.total_power as u128 / 3) as u64 + 1;
        let majority = self.registered_power / 2 + 1;
        two_thirds.max(majority)
    }

    /// Whether the active members alone can reach [`quorum`](Self::quorum).
    pub fn can_reach_quorum(&self) -> bool {
        self.total_power >= self.quorum()
    }

    pub fn index_of(&self, id: &ValidatorId) -> Option<ValidatorIndex> {
        self.lookup.get(id).copied()
    }

    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn id_of(&self, index: ValidatorIndex) -> Option<&ValidatorId> {
        self.members.get(index.0).map(|(id, _)| id)
    }

    pub fn power_of(&self, index: ValidatorIndex) -> u64 {
        self.members.get(index.0).map(|(_, power)| *power).unwrap_or(0)
    }

    /// Iterate `(index, id, power)`.
    pub fn iter(&self) -> impl Iterator<Item = (ValidatorIndex, &ValidatorId, u64)> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, (id, power))| (ValidatorIndex(i), id, *power))
    }

    /// Proposer for `(height, round)`.
    ///
    /// Round 0 is a stake-weighted pick seeded by SHA-256 of the height; round
    /// `r` moves `r` positions along the sorted set.
    pub fn proposer_for(&self, height: u64, round: u32) -> Option<ValidatorId> {
        if self.members.is_empty() {
            return None;
        }
        let base = self.weighted_index(height);
        let index = (base + round as usize) % self.members.len();
        Some(self.members[index].0)
    }

    fn weighted_index(&self, height: u64) -> usize {
        let digest = Sha256::digest(height.to_le_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let target = u64::from_be_bytes(seed_bytes) % self.total_power;

        let mut cumulative = 0u64;
        for (i, (_, power)) in self.members.iter().enumerate() {
            cumulative += power;
            if target < cumulative {
                return i;
            }
        }
        self.members.len() - 1
    }
}
