//! # Vote Aggregator
//!
//! Tallies prevotes and precommits for the current height.
//!
//! The aggregator is bound to one height and its frozen [`VotingSet`]. The
//! round manager moves it to the next height after a commit, which prunes
//! every older tally.

use crate::domain::{AggregationError, PhaseTally, TallyVerdict, VoteOutcome};
use ql_01_peer_registry::VotingSet;
use shared_types::{short_id, CommitCertificate, Hash, Vote, VoteKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counters across the aggregator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub votes_counted: u64,
    pub duplicates: u64,
    pub equivocations: u64,
}

/// Per-(height, round, kind) vote tallies.
#[derive(Debug, Clone)]
pub struct VoteAggregator {
    height: u64,
    voting_set: Arc<VotingSet>,
    tallies: HashMap<(u64, u32, VoteKind), PhaseTally>,
    stats: AggregatorStats,
}

impl VoteAggregator {
    pub fn new(height: u64, voting_set: Arc<VotingSet>) -> Self {
        Self {
            height,
            voting_set,
            tallies: HashMap::new(),
            stats: AggregatorStats::default(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn voting_set(&self) -> &Arc<VotingSet> {
        &self.voting_set
    }

    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Move to `height` with a new voting set, dropping older tallies.
    pub fn advance_height(&mut self, height: u64, voting_set: Arc<VotingSet>) {
        self.height = height;
        self.voting_set = voting_set;
        self.prune_below(height);
    }

    /// Swap the voting set of the current height. Its tallies index the old
    /// set and are dropped.
    pub fn replace_voting_set(&mut self, voting_set: Arc<VotingSet>) {
        let height = self.height;
        self.tallies.retain(|(h, _, _), _| *h != height);
        self.voting_set = voting_set;
    }

    /// Tally a vote. Signature checks are the caller's job.
    pub fn add_vote(&mut self, vote: Vote) -> Result<VoteOutcome, AggregationError> {
        if vote.height != self.height {
            return Err(AggregationError::WrongHeight {
                expected: self.height,
                got: vote.height,
            });
        }
        let index = self
            .voting_set
            .index_of(&vote.voter)
            .ok_or(AggregationError::UnknownVoter(vote.voter))?;
        let power = self.voting_set.power_of(index);

        let key = (vote.height, vote.round, vote.kind);
        let voter = vote.voter;
        let outcome = self.tallies.entry(key).or_default().add(index, power, vote);

        match &outcome {
            VoteOutcome::Counted => {
                self.stats.votes_counted += 1;
                debug!(
                    height = key.0,
                    round = key.1,
                    kind = ?key.2,
                    voter = %short_id(&voter),
                    power,
                    "[aggregator] vote counted"
                );
            }
            VoteOutcome::Duplicate => self.stats.duplicates += 1,
            VoteOutcome::Equivocation { .. } => {
                self.stats.equivocations += 1;
                warn!(
                    height = key.0,
                    round = key.1,
                    kind = ?key.2,
                    voter = %short_id(&voter),
                    "[aggregator] equivocation, voter excluded from phase"
                );
            }
        }
        Ok(outcome)
    }

    /// Quorum verdict for one phase.
    pub fn tally(&self, height: u64, round: u32, kind: VoteKind) -> TallyVerdict {
        match self.tallies.get(&(height, round, kind)) {
            Some(tally) => tally.verdict(&self.voting_set),
            None => PhaseTally::default().verdict(&self.voting_set),
        }
    }

    /// Counted power for `hash` in one phase.
    pub fn power_for(&self, height: u64, round: u32, kind: VoteKind, hash: &Hash) -> u64 {
        self.tallies
            .get(&(height, round, kind))
            .map(|tally| tally.power_for(hash))
            .unwrap_or(0)
    }

    /// Certificate for `hash` if its counted power reaches quorum.
    pub fn certificate(
        &self,
        height: u64,
        round: u32,
        kind: VoteKind,
        hash: &Hash,
    ) -> Option<CommitCertificate> {
        let tally = self.tallies.get(&(height, round, kind))?;
        let voting_power = tally.power_for(hash);
        if voting_power < self.voting_set.quorum() {
            return None;
        }
        Some(CommitCertificate {
            block_hash: *hash,
            height,
            round,
            precommits: tally.votes_for(hash),
            voting_power,
        })
    }

    /// Rounds of `height` that have any votes, ascending.
    pub fn rounds_with_votes(&self, height: u64) -> Vec<u32> {
        let mut rounds: Vec<u32> = self
            .tallies
            .keys()
            .filter(|(h, _, _)| *h == height)
            .map(|(_, round, _)| *round)
            .collect();
        rounds.sort_unstable();
        rounds.dedup();
        rounds
    }

    /// Drop tallies for heights below `height`.
    pub fn prune_below(&mut self, height: u64) {
        self.tallies.retain(|(h, _, _), _| *h >= height);
    }

    /// Drop tallies of `height` for rounds below `round`.
    pub fn prune_rounds_before(&mut self, height: u64, round: u32) {
        self.tallies
            .retain(|(h, r, _), _| *h != height || *r >= round);
    }

    /// Number of live phase tallies.
    pub fn tally_count(&self) -> usize {
        self.tallies.len()
    }
}
