//! # Phase Tally
//!
//! Votes of one `(height, round, kind)`, keyed by validator index.
//!
//! ## Equivocation
//!
//! A validator's first vote is stored. A second vote for a different hash
//! marks the validator as an equivocator and removes its power from every
//! hash. The power stays spent, so it cannot be counted again and is not
//! available to the no-quorum bound either.

use ql_01_peer_registry::{ValidatorIndex, VotingSet};
use shared_types::{Hash, Vote};
use std::collections::{BTreeSet, HashMap};

/// Result of adding a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote accepted and counted.
    Counted,
    /// Same vote seen before; ignored.
    Duplicate,
    /// Conflicting vote from the same validator; both excluded.
    Equivocation { first: Box<Vote>, second: Box<Vote> },
}

/// Quorum verdict for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyVerdict {
    /// Quorum still reachable but not reached.
    Pending,
    /// A hash holds quorum.
    QuorumReached(Hash),
    /// No hash can reach quorum with the power that has not voted yet.
    NoQuorumPossible,
}

/// Votes of a single phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseTally {
    votes: HashMap<ValidatorIndex, Vote>,
    by_hash: HashMap<Hash, u64>,
    equivocators: BTreeSet<ValidatorIndex>,
    spent_power: u64,
}

impl PhaseTally {
    /// Record a vote from `index`.
    pub fn add(&mut self, index: ValidatorIndex, power: u64, vote: Vote) -> VoteOutcome {
        let Some(first) = self.votes.get(&index) else {
            *self.by_hash.entry(vote.block_hash).or_default() += power;
            self.spent_power += power;
            self.votes.insert(index, vote);
            return VoteOutcome::Counted;
        };

        if first.block_hash == vote.block_hash {
            return VoteOutcome::Duplicate;
        }

        let first = first.clone();
        if self.equivocators.insert(index) {
            if let Some(counted) = self.by_hash.get_mut(&first.block_hash) {
                *counted = counted.saturating_sub(power);
            }
        }
        VoteOutcome::Equivocation {
            first: Box::new(first),
            second: Box::new(vote),
        }
    }

    /// Current verdict against `voting_set`'s quorum.
    pub fn verdict(&self, voting_set: &VotingSet) -> TallyVerdict {
        let quorum = voting_set.quorum();
        let leader = self
            .by_hash
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(hash, power)| (*hash, *power));

        if let Some((hash, power)) = leader {
            if power >= quorum {
                return TallyVerdict::QuorumReached(hash);
            }
        }

        let leading_power = leader.map(|(_, power)| power).unwrap_or(0);
        let remaining = voting_set.total_power().saturating_sub(self.spent_power);
        if leading_power + remaining < quorum {
            TallyVerdict::NoQuorumPossible
        } else {
            TallyVerdict::Pending
        }
    }

    /// Counted power for `hash`.
    pub fn power_for(&self, hash: &Hash) -> u64 {
        self.by_hash.get(hash).copied().unwrap_or(0)
    }

    /// Counted votes for `hash`, equivocators excluded.
    pub fn votes_for(&self, hash: &Hash) -> Vec<Vote> {
        let mut votes: Vec<_> = self
            .votes
            .iter()
            .filter(|(index, vote)| vote.block_hash == *hash && !self.equivocators.contains(index))
            .map(|(index, vote)| (*index, vote.clone()))
            .collect();
        votes.sort_by_key(|(index, _)| *index);
        votes.into_iter().map(|(_, vote)| vote).collect()
    }

    /// Power of every validator that has voted in this phase.
    pub fn spent_power(&self) -> u64 {
        self.spent_power
    }

    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    pub fn equivocator_count(&self) -> usize {
        self.equivocators.len()
    }
}
