//! # Round Manager Service
//!
//! The consensus state machine for one validator.
//!
//! ```text
//! Propose ──proposal──→ Prevote ──prevote quorum──→ Precommit ──precommit quorum──→ Commit
//!    │                     │                           │                             │
//!    └──timeout────────────┴──timeout / no quorum──────┴──→ NewRound(r + 1)          └──→ height + 1
//! ```
//!
//! The manager owns the peer registry, the vote aggregator and the shard
//! router. It is driven by a single task; every method takes `&mut self` and
//! nothing inside blocks on I/O. Outbound messages go through the
//! non-blocking [`ConsensusBroadcaster`].

use crate::config::RoundConfig;
use crate::domain::{
    AbandonReason, ConsensusError, ConsensusResult, LockedBlock, PhaseOutcome, Round,
};
use crate::metrics;
use crate::ports::{ConsensusBroadcaster, TimeSource};
use ql_01_peer_registry::{FaultEvidence, PeerRegistry, VotingSet};
use ql_02_vote_aggregation::{TallyVerdict, VoteAggregator, VoteOutcome};
use ql_05_shard_router::{shard_state_roots, ShardBlock, ShardRouter};
use shared_types::{
    apply_block, apply_transaction, short_id, Block, CommitCertificate, Hash, LedgerStore,
    NetworkMessage, ObserverReason, Participation, Phase, Timestamp, Transaction, ValidatorId,
    ValidatorKeyPair, Vote, VoteKind,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Upper bound on transitions taken by one [`RoundManager::drive`] call.
const MAX_STEPS_PER_DRIVE: usize = 16;

/// Collaborators of the round manager.
#[derive(Clone)]
pub struct RoundDependencies {
    pub ledger: Arc<dyn LedgerStore>,
    pub broadcaster: Arc<dyn ConsensusBroadcaster>,
    pub clock: Arc<dyn TimeSource>,
}

/// The last block this node committed, with its certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedBlock {
    pub block: Block,
    pub certificate: CommitCertificate,
}

/// Consensus state machine.
pub struct RoundManager {
    config: RoundConfig,
    keypair: ValidatorKeyPair,
    id: ValidatorId,
    registry: PeerRegistry,
    aggregator: VoteAggregator,
    /// Every registered validator, frozen per height, for proposer rotation.
    proposer_set: Arc<VotingSet>,
    router: ShardRouter,
    deps: RoundDependencies,
    round: Round,
    lock: Option<LockedBlock>,
    /// Valid proposals of the current height, by hash.
    proposals: HashMap<Hash, Block>,
    /// First valid proposal seen for each round.
    round_proposals: HashMap<u32, Hash>,
    own_votes: HashSet<(u32, VoteKind)>,
    proposed_rounds: HashSet<u32>,
    parent_roots: Vec<Hash>,
    participation: Participation,
    last_commit: Option<CommittedBlock>,
    last_catch_up: Option<(u64, Timestamp)>,
}

impl RoundManager {
    /// Create a manager positioned at `ledger head + 1`, round 0.
    pub fn new(
        config: RoundConfig,
        keypair: ValidatorKeyPair,
        registry: PeerRegistry,
        router: ShardRouter,
        deps: RoundDependencies,
    ) -> Self {
        let height = deps.ledger.head().height + 1;
        let id = keypair.public_key();
        let aggregator = VoteAggregator::new(height, Arc::new(registry.voting_set()));
        let proposer_set = Arc::new(registry.proposer_set());
        let mut manager = Self {
            config,
            keypair,
            id,
            registry,
            aggregator,
            proposer_set,
            router,
            deps,
            round: Round {
                height,
                round: 0,
                phase: Phase::Propose,
                proposer: None,
                deadline: 0,
            },
            lock: None,
            proposals: HashMap::new(),
            round_proposals: HashMap::new(),
            own_votes: HashSet::new(),
            proposed_rounds: HashSet::new(),
            parent_roots: Vec::new(),
            participation: Participation::Voting,
            last_commit: None,
            last_catch_up: None,
        };
        manager.start_height(height);
        manager
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn id(&self) -> ValidatorId {
        self.id
    }

    /// Height being decided.
    pub fn height(&self) -> u64 {
        self.round.height
    }

    /// Height of the last committed block.
    pub fn committed_height(&self) -> u64 {
        self.round.height.saturating_sub(1)
    }

    pub fn current_round(&self) -> &Round {
        &self.round
    }

    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    pub fn participation(&self) -> Participation {
        self.participation
    }

    pub fn locked_block(&self) -> Option<&LockedBlock> {
        self.lock.as_ref()
    }

    pub fn last_commit(&self) -> Option<&CommittedBlock> {
        self.last_commit.as_ref()
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PeerRegistry {
        &mut self.registry
    }

    pub fn aggregator(&self) -> &VoteAggregator {
        &self.aggregator
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// Stored proposal for the current height.
    pub fn proposal(&self, hash: &Hash) -> Option<&Block> {
        self.proposals.get(hash)
    }

    /// Whether this node is the proposer of the current round.
    pub fn is_proposer(&self) -> bool {
        self.round.proposer == Some(self.id)
    }

    /// Whether the runtime should assemble a proposal now.
    pub fn should_propose(&self) -> bool {
        self.participation.is_voting()
            && self.round.phase == Phase::Propose
            && self.is_proposer()
            && !self.proposed_rounds.contains(&self.round.round)
    }

    /// Whether validators holding more than a third of the registered power
    /// announce heights more than `threshold` blocks past the ledger.
    pub fn needs_sync(&self, threshold: u64) -> bool {
        let candidates = self.sync_candidates(threshold);
        self.registry
            .exceeds_fault_bound(candidates.iter().map(|(peer, _)| peer))
    }

    /// Peers to sync from, highest first.
    pub fn sync_candidates(&self, threshold: u64) -> Vec<(ValidatorId, u64)> {
        self.registry
            .peers_ahead_of(self.committed_height(), threshold)
            .into_iter()
            .filter(|(peer, _)| *peer != self.id)
            .collect()
    }

    // =========================================================================
    // PROPOSAL
    // =========================================================================

    /// Filter and split mempool transactions into shard blocks for this height.
    ///
    /// Transactions are checked in final block order (shard ascending) against
    /// the ledger view; ones that would not apply are dropped.
    pub fn prepare_candidates(&mut self, txs: Vec<Transaction>) -> ConsensusResult<Vec<ShardBlock>> {
        let view = self.deps.ledger.view();
        let mut ordered = txs;
        ordered.sort_by_key(|tx| self.router.assign(tx));

        let mut accounts = view.accounts.clone();
        let mut accepted = Vec::with_capacity(ordered.len().min(self.config.max_block_txs));
        for tx in ordered {
            if accepted.len() >= self.config.max_block_txs {
                break;
            }
            match apply_transaction(&mut accounts, &tx) {
                Ok(()) => accepted.push(tx),
                Err(e) => debug!(tx = %short_id(&tx.hash()), error = %e, "[consensus] dropping candidate"),
            }
        }

        let partition = self.router.partition(accepted);
        Ok(self
            .router
            .build_shard_blocks(partition, self.round.height, &self.parent_roots)?)
    }

    /// Build and broadcast this round's block.
    ///
    /// Only the round's proposer may call this. A validator locked on a block
    /// re-proposes that block and ignores `shard_blocks`.
    pub fn propose_block(&mut self, shard_blocks: Vec<ShardBlock>) -> ConsensusResult<Block> {
        self.ensure_voting()?;
        let (height, round) = (self.round.height, self.round.round);
        if self.round.phase != Phase::Propose {
            return Err(ConsensusError::WrongPhase(self.round.phase));
        }
        if !self.is_proposer() {
            return Err(ConsensusError::NotProposer { height, round });
        }
        if self.proposed_rounds.contains(&round) {
            return Err(ConsensusError::AlreadyProposed(round));
        }

        let block = match &self.lock {
            Some(locked) => locked.block.clone(),
            None => self.assemble_block(shard_blocks)?,
        };

        self.proposed_rounds.insert(round);
        info!(
            height,
            round,
            hash = %short_id(&block.hash),
            txs = block.transactions.len(),
            "[consensus] proposing block"
        );
        self.deps.broadcaster.broadcast(NetworkMessage::Proposal {
            height,
            round,
            block: block.clone(),
        });
        self.store_proposal(block.clone(), round);
        Ok(block)
    }

    fn assemble_block(&mut self, shard_blocks: Vec<ShardBlock>) -> ConsensusResult<Block> {
        if shard_blocks.iter().all(|b| b.transactions.is_empty()) {
            return Err(ConsensusError::EmptyCandidate);
        }
        let (height, round) = (self.round.height, self.round.round);
        let merged = self
            .router
            .merge_shard_blocks(shard_blocks, height, &self.parent_roots)?;
        if merged.transactions.len() > self.config.max_block_txs {
            return Err(ConsensusError::InvalidProposal(format!(
                "{} transactions exceed limit {}",
                merged.transactions.len(),
                self.config.max_block_txs
            )));
        }

        let view = self.deps.ledger.view();
        if view.head.height + 1 != height {
            return Err(ConsensusError::LedgerMismatch {
                expected: height - 1,
                ledger: view.head.height,
            });
        }
        apply_block(&view.accounts, &merged.transactions)?;

        Ok(Block::new(
            height,
            view.head.hash,
            round,
            self.id,
            self.deps.clock.now(),
            merged.shard_root,
            merged.transactions,
        ))
    }

    /// Handle a proposal received from the network.
    pub fn on_proposal(&mut self, block: Block, round: u32) -> ConsensusResult<()> {
        let height = self.round.height;
        if block.height < height {
            return Err(ConsensusError::Expired {
                height: block.height,
                round,
            });
        }
        if block.height > height {
            return Err(ConsensusError::FutureHeight {
                current: height,
                got: block.height,
            });
        }
        self.check_round_window(round)?;

        if !self.proposals.contains_key(&block.hash) {
            if let Err(reason) = self.validate_proposal(&block, round) {
                warn!(
                    height,
                    round,
                    proposer = %short_id(&block.proposer),
                    %reason,
                    "[consensus] rejecting proposal"
                );
                let evidence = FaultEvidence::MalformedProposal {
                    height,
                    round,
                    reason: reason.clone(),
                };
                self.record_fault(&block.proposer, evidence);
                return Err(ConsensusError::InvalidProposal(reason));
            }
        }

        self.store_proposal(block, round);
        Ok(())
    }

    fn validate_proposal(&self, block: &Block, round: u32) -> Result<(), String> {
        if block.round > round {
            return Err(format!("block round {} after proposal round {round}", block.round));
        }
        let expected = self.proposer_set.proposer_for(block.height, block.round);
        if expected != Some(block.proposer) {
            return Err("unexpected proposer".into());
        }
        if !block.has_valid_hash() {
            return Err("hash mismatch".into());
        }
        let view = self.deps.ledger.view();
        if block.previous_hash != view.head.hash {
            return Err("unknown parent".into());
        }
        if block.transactions.is_empty() {
            return Err("empty block".into());
        }
        if block.transactions.len() > self.config.max_block_txs {
            return Err("too many transactions".into());
        }
        self.router
            .verify_layout(&block.transactions, &self.parent_roots, &block.shard_root)
            .map_err(|e| e.to_string())?;
        apply_block(&view.accounts, &block.transactions).map_err(|e| e.to_string())?;
        Ok(())
    }

    fn store_proposal(&mut self, block: Block, round: u32) {
        let hash = block.hash;
        self.proposals.entry(hash).or_insert(block);
        let first = *self.round_proposals.entry(round).or_insert(hash);
        if first != hash {
            warn!(
                height = self.round.height,
                round,
                "[consensus] second proposal for round ignored"
            );
        }
        if round == self.round.round && self.round.phase == Phase::Propose {
            self.prevote_for_proposal(first);
        }
    }

    fn prevote_for_proposal(&mut self, proposed: Hash) {
        let target = match &self.lock {
            Some(locked) => locked.hash(),
            None => proposed,
        };
        self.enter_phase(Phase::Prevote);
        self.cast_vote(VoteKind::Prevote, target);
    }

    // =========================================================================
    // VOTES
    // =========================================================================

    /// Validate and tally a vote; returns the verdict for the vote's phase.
    pub fn register_vote(&mut self, vote: Vote) -> ConsensusResult<TallyVerdict> {
        let height = self.round.height;
        let stale_prevote = vote.kind == VoteKind::Prevote && vote.round < self.round.round;
        if vote.height < height || (vote.height == height && stale_prevote) {
            metrics::record_vote_rejected("expired");
            return Err(ConsensusError::Expired {
                height: vote.height,
                round: vote.round,
            });
        }
        if vote.height > height {
            metrics::record_vote_rejected("future_height");
            return Err(ConsensusError::FutureHeight {
                current: height,
                got: vote.height,
            });
        }
        if let Err(e) = self.check_round_window(vote.round) {
            metrics::record_vote_rejected("future_round");
            return Err(e);
        }
        if !vote.verify_signature() {
            metrics::record_vote_rejected("signature");
            let evidence = FaultEvidence::InvalidSignature {
                height: vote.height,
                round: vote.round,
            };
            self.record_fault(&vote.voter, evidence);
            return Err(ConsensusError::InvalidSignature);
        }

        let (round, kind, voter) = (vote.round, vote.kind, vote.voter);
        match self.aggregator.add_vote(vote) {
            Ok(VoteOutcome::Counted) => {
                let now = self.deps.clock.now();
                if let Err(e) = self.registry.record_vote_seen(&voter, now) {
                    debug!(error = %e, "[consensus] vote from unregistered voter");
                }
            }
            Ok(VoteOutcome::Duplicate) => {}
            Ok(VoteOutcome::Equivocation { first, second }) => {
                metrics::record_equivocation();
                self.record_fault(&voter, FaultEvidence::equivocation(&first, &second));
            }
            Err(e) => {
                metrics::record_vote_rejected("unknown_voter");
                return Err(e.into());
            }
        }
        Ok(self.aggregator.tally(height, round, kind))
    }

    /// Only rounds up to `max_future_rounds` ahead are tracked; anything
    /// further would grow the tallies without bound.
    fn check_round_window(&self, round: u32) -> ConsensusResult<()> {
        let limit = self.round.round.saturating_add(self.config.max_future_rounds);
        if round > limit {
            return Err(ConsensusError::FutureRound {
                current: self.round.round,
                got: round,
            });
        }
        Ok(())
    }

    fn cast_vote(&mut self, kind: VoteKind, hash: Hash) {
        if !self.participation.is_voting() {
            return;
        }
        let (height, round) = (self.round.height, self.round.round);
        if !self.own_votes.insert((round, kind)) {
            return;
        }
        let vote = Vote::signed(&self.keypair, height, round, kind, hash);
        if let Err(e) = self.aggregator.add_vote(vote.clone()) {
            warn!(error = %e, "[consensus] own vote not tallied");
        }
        debug!(height, round, ?kind, hash = %short_id(&hash), "[consensus] vote cast");
        self.deps.broadcaster.broadcast(NetworkMessage::Vote(vote));
    }

    // =========================================================================
    // PHASE TRANSITIONS
    // =========================================================================

    /// Take at most one transition based on tallies and the phase deadline.
    pub fn advance_phase(&mut self) -> ConsensusResult<PhaseOutcome> {
        if let Some(outcome) = self.try_commit()? {
            return Ok(outcome);
        }

        let now = self.deps.clock.now();
        let (height, round, phase) = (self.round.height, self.round.round, self.round.phase);
        let expired = self.round.is_expired(now);
        // A set below the registered majority never reaches quorum; rounds
        // then only end on their deadline instead of spinning.
        let reachable = self.aggregator.voting_set().can_reach_quorum();

        let outcome = match phase {
            Phase::Propose if expired => self.abandon_round(AbandonReason::Timeout(phase)),
            Phase::Prevote => match self.aggregator.tally(height, round, VoteKind::Prevote) {
                TallyVerdict::QuorumReached(hash) => {
                    self.on_prevote_quorum(hash);
                    PhaseOutcome::Entered(Phase::Precommit)
                }
                TallyVerdict::NoQuorumPossible if reachable => {
                    self.abandon_round(AbandonReason::NoQuorumPossible(phase))
                }
                _ if expired => self.abandon_round(AbandonReason::Timeout(phase)),
                _ => PhaseOutcome::Stayed,
            },
            Phase::Precommit => match self.aggregator.tally(height, round, VoteKind::Precommit) {
                TallyVerdict::NoQuorumPossible if reachable => {
                    self.abandon_round(AbandonReason::NoQuorumPossible(phase))
                }
                // A quorum without the block waits for the block until the deadline.
                _ if expired => self.abandon_round(AbandonReason::Timeout(phase)),
                _ => PhaseOutcome::Stayed,
            },
            Phase::Propose | Phase::Commit => PhaseOutcome::Stayed,
        };
        Ok(outcome)
    }

    /// Call [`advance_phase`](Self::advance_phase) until nothing changes.
    pub fn drive(&mut self) -> ConsensusResult<Vec<PhaseOutcome>> {
        let mut outcomes = Vec::new();
        for _ in 0..MAX_STEPS_PER_DRIVE {
            match self.advance_phase()? {
                PhaseOutcome::Stayed => break,
                outcome => outcomes.push(outcome),
            }
        }
        Ok(outcomes)
    }

    fn on_prevote_quorum(&mut self, hash: Hash) {
        let round = self.round.round;
        self.enter_phase(Phase::Precommit);
        match self.proposals.get(&hash).cloned() {
            Some(block) => {
                self.lock = Some(LockedBlock { round, block });
                self.cast_vote(VoteKind::Precommit, hash);
            }
            None => {
                let release = self
                    .lock
                    .as_ref()
                    .is_some_and(|locked| locked.round < round && locked.hash() != hash);
                if release {
                    debug!(height = self.round.height, round, "[consensus] lock released");
                    self.lock = None;
                }
            }
        }
    }

    fn try_commit(&mut self) -> ConsensusResult<Option<PhaseOutcome>> {
        let height = self.round.height;
        for round in self.aggregator.rounds_with_votes(height) {
            if let TallyVerdict::QuorumReached(hash) =
                self.aggregator.tally(height, round, VoteKind::Precommit)
            {
                if let Some(block) = self.proposals.get(&hash).cloned() {
                    return self.commit(block, round).map(Some);
                }
            }
        }
        Ok(None)
    }

    fn commit(&mut self, block: Block, round: u32) -> ConsensusResult<PhaseOutcome> {
        let (height, hash) = (block.height, block.hash);
        self.round.phase = Phase::Commit;

        if let Err(e) = self.deps.ledger.commit(&block) {
            error!(height, round, error = %e, "[consensus] ledger commit failed, leaving voting set");
            self.participation = Participation::Observer(ObserverReason::StorageFailure);
            return Err(ConsensusError::Storage(e));
        }

        if let Err(e) = self.registry.record_block_proposed(&block.proposer) {
            debug!(error = %e, "[consensus] proposer not in registry");
        }
        metrics::record_block_committed();
        info!(
            height,
            round,
            hash = %short_id(&hash),
            txs = block.transactions.len(),
            "[consensus] block committed"
        );

        if let Some(certificate) = self
            .aggregator
            .certificate(height, round, VoteKind::Precommit, &hash)
        {
            self.last_commit = Some(CommittedBlock { block, certificate });
            self.broadcast_last_commit();
        }

        if self.participation == Participation::Observer(ObserverReason::StorageFailure) {
            info!(height, "[consensus] ledger healthy again, resuming voting");
            self.participation = Participation::Voting;
        }
        self.start_height(height + 1);
        Ok(PhaseOutcome::Committed { height, round, hash })
    }

    fn broadcast_last_commit(&self) {
        let Some(commit) = &self.last_commit else {
            return;
        };
        self.deps.broadcaster.broadcast(NetworkMessage::Proposal {
            height: commit.block.height,
            round: commit.certificate.round,
            block: commit.block.clone(),
        });
        for precommit in &commit.certificate.precommits {
            self.deps
                .broadcaster
                .broadcast(NetworkMessage::Vote(precommit.clone()));
        }
    }

    fn abandon_round(&mut self, reason: AbandonReason) -> PhaseOutcome {
        let (height, round) = (self.round.height, self.round.round);
        metrics::record_round_abandoned();
        warn!(height, round, ?reason, "[consensus] round abandoned");
        self.enter_round(round + 1);
        PhaseOutcome::RoundAbandoned {
            height,
            round,
            next_round: round + 1,
            reason,
        }
    }

    fn start_height(&mut self, height: u64) {
        let voting_set = Arc::new(self.registry.voting_set());
        self.aggregator.advance_height(height, voting_set);
        self.proposer_set = Arc::new(self.registry.proposer_set());
        self.proposals.clear();
        self.round_proposals.clear();
        self.own_votes.clear();
        self.proposed_rounds.clear();
        self.lock = None;

        let view = self.deps.ledger.view();
        self.parent_roots = shard_state_roots(&view.accounts, self.router.shard_count());
        self.round.height = height;
        self.refresh_membership();
        self.enter_round(0);
    }

    fn enter_round(&mut self, round: u32) {
        let height = self.round.height;
        let proposer = self.proposer_set.proposer_for(height, round);
        self.round = Round {
            height,
            round,
            phase: Phase::Propose,
            proposer,
            deadline: self.deps.clock.now() + self.config.timeout(Phase::Propose, round),
        };
        if round > self.config.retained_rounds {
            let oldest = round - self.config.retained_rounds;
            self.aggregator.prune_rounds_before(height, oldest);
            self.round_proposals.retain(|r, _| *r >= oldest);
        }
        debug!(
            height,
            round,
            proposer = %proposer.map(|p| short_id(&p)).unwrap_or_default(),
            "[consensus] entering round"
        );

        if let Some(hash) = self.round_proposals.get(&round).copied() {
            self.prevote_for_proposal(hash);
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.round.phase = phase;
        self.round.deadline = self.deps.clock.now() + self.config.timeout(phase, self.round.round);
    }

    // =========================================================================
    // PARTICIPATION AND SYNC
    // =========================================================================

    fn refresh_membership(&mut self) {
        let in_set = self.aggregator.voting_set().contains(&self.id);
        match self.participation {
            Participation::Voting if !in_set => {
                info!(height = self.round.height, "[consensus] not in voting set, observing");
                self.participation = Participation::Observer(ObserverReason::NotInValidatorSet);
            }
            Participation::Observer(ObserverReason::NotInValidatorSet) if in_set => {
                self.participation = Participation::Voting;
            }
            _ => {}
        }
    }

    fn ensure_voting(&self) -> ConsensusResult<()> {
        match self.participation {
            Participation::Voting => Ok(()),
            Participation::Observer(reason) => Err(ConsensusError::NotVoting(reason)),
        }
    }

    /// Stop voting while state sync runs.
    pub fn begin_sync(&mut self) {
        if self.participation != Participation::Observer(ObserverReason::StorageFailure) {
            self.participation = Participation::Observer(ObserverReason::Syncing);
        }
    }

    /// Sync gave up; stay an observer until a later sync succeeds.
    pub fn sync_exhausted(&mut self) {
        warn!(height = self.round.height, "[consensus] sync exhausted, remaining observer");
        self.participation = Participation::Observer(ObserverReason::SyncExhausted);
    }

    /// Jump to `height + 1` after the ledger was restored to `height`.
    pub fn fast_forward(&mut self, height: u64, block_hash: Hash) -> ConsensusResult<()> {
        let head = self.deps.ledger.head();
        if head.height != height || head.hash != block_hash {
            return Err(ConsensusError::LedgerMismatch {
                expected: height,
                ledger: head.height,
            });
        }
        if height < self.round.height {
            return Err(ConsensusError::Expired { height, round: 0 });
        }

        info!(from = self.round.height, to = height + 1, "[consensus] fast-forwarding after sync");
        if matches!(
            self.participation,
            Participation::Observer(ObserverReason::Syncing | ObserverReason::SyncExhausted)
        ) {
            self.participation = Participation::Voting;
        }
        self.last_commit = None;
        self.start_height(height + 1);
        Ok(())
    }

    /// A sync attempt against `peer` failed. Its announced height stops
    /// counting toward [`needs_sync`](Self::needs_sync) until it announces
    /// again; a `fault` records the contradiction against it.
    pub fn sync_peer_failed(&mut self, peer: &ValidatorId, fault: Option<String>) {
        let committed = self.committed_height();
        let claimed = match self.registry.discount_height(peer, committed) {
            Ok(claimed) => claimed,
            Err(e) => {
                debug!(error = %e, "[consensus] sync peer not in registry");
                return;
            }
        };
        if let Some(reason) = fault {
            let evidence = FaultEvidence::UnverifiableSnapshot {
                height: claimed,
                reason,
            };
            self.record_fault(peer, evidence);
        }
    }

    /// Re-enter voting, e.g. after the ledger store recovered.
    pub fn resume_voting(&mut self) {
        self.participation = Participation::Voting;
        self.refresh_membership();
    }

    // =========================================================================
    // PEERS
    // =========================================================================

    /// Heartbeat from a peer. Re-broadcasts the last commit to a peer one
    /// height behind.
    pub fn on_heartbeat(&mut self, from: &ValidatorId, height: u64) -> ConsensusResult<()> {
        let now = self.deps.clock.now();
        self.registry.heartbeat(from, height, now)?;
        self.refreeze_if_unreachable();

        let committed = self.committed_height();
        if height.checked_add(1) == Some(committed) {
            let recent = self.last_catch_up.is_some_and(|(h, at)| {
                h == committed && now.saturating_sub(at) < self.config.propose_timeout_ms
            });
            if !recent {
                debug!(peer = %short_id(from), height, "[consensus] peer behind, re-broadcasting commit");
                self.broadcast_last_commit();
                self.last_catch_up = Some((committed, now));
            }
        }
        Ok(())
    }

    /// A voting set that can never reach quorum (most validators were
    /// expired when it froze) is rebuilt from the registry once enough of
    /// them are live again. Nothing was decided under the old set.
    fn refreeze_if_unreachable(&mut self) {
        if self.aggregator.voting_set().can_reach_quorum() {
            return;
        }
        let fresh = self.registry.voting_set();
        if !fresh.can_reach_quorum() {
            return;
        }
        let (height, round) = (self.round.height, self.round.round);
        info!(height, round, members = fresh.len(), "[consensus] voting set refrozen");
        self.aggregator.replace_voting_set(Arc::new(fresh));
        self.refresh_membership();
        self.enter_round(round + 1);
    }

    /// Refresh own liveness and expire silent validators.
    pub fn expire_stale_peers(&mut self) -> Vec<ValidatorId> {
        let now = self.deps.clock.now();
        let committed = self.committed_height();
        if self.registry.get(&self.id).is_some() {
            let _ = self.registry.heartbeat(&self.id, committed, now);
        }
        self.registry.expire_stale(now)
    }

    fn record_fault(&mut self, offender: &ValidatorId, evidence: FaultEvidence) {
        let now = self.deps.clock.now();
        if let Err(e) = self.registry.record_fault(offender, evidence, now) {
            debug!(error = %e, "[consensus] fault from unknown validator not recorded");
        }
    }
}
