//! # Consensus Actor
//!
//! The single task that owns a node's [`RoundManager`]. Network messages and
//! sync results arrive on a bounded inbox; a ticker drives phase deadlines,
//! proposals, heartbeats and the sync trigger. Nothing else mutates
//! consensus state.
//!
//! ```text
//!   inbound task ──try_send──→ [inbox] ──→ ConsensusActor ──→ broadcaster
//!   sync task ─────send──────→    ↑              │
//!                                 │              └──sync request──→ sync task
//!                              ticker
//! ```

use crate::adapters::InMemoryMempool;
use crate::config::RuntimeConfig;
use ql_03_round_manager::{
    ConsensusBroadcaster, ConsensusError, MempoolGateway, PhaseOutcome, RoundManager,
};
use ql_04_state_sync::{SyncConfig, SyncError, SyncOutcome};
use shared_types::{
    short_id, Envelope, Hash, LedgerStore, NetworkMessage, ObserverReason, Participation, Phase,
    ValidatorId,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Inputs of the consensus actor.
#[derive(Debug)]
pub enum ActorInput {
    /// A message from a peer.
    Network(Envelope),
    /// Result of a state sync run, with the peers that failed along the way.
    Sync {
        outcome: SyncOutcome,
        failed: Vec<(ValidatorId, SyncError)>,
    },
}

/// Published after every actor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
    pub committed_height: u64,
    pub round: u32,
    pub phase: Phase,
    pub participation: Participation,
    /// Faults recorded against any validator so far.
    pub faults: usize,
    /// Shards whose last proposed sub-block was rejected.
    pub unhealthy_shards: usize,
}

/// Owner of consensus state for one node.
pub struct ConsensusActor {
    manager: RoundManager,
    ledger: Arc<dyn LedgerStore>,
    mempool: Arc<InMemoryMempool>,
    broadcaster: Arc<dyn ConsensusBroadcaster>,
    inbox: mpsc::Receiver<ActorInput>,
    sync_requests: mpsc::Sender<Vec<(ValidatorId, u64)>>,
    status: watch::Sender<NodeStatus>,
    runtime: RuntimeConfig,
    sync: SyncConfig,
    syncing: bool,
    sync_retry_at: Option<Instant>,
}

impl ConsensusActor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manager: RoundManager,
        ledger: Arc<dyn LedgerStore>,
        mempool: Arc<InMemoryMempool>,
        broadcaster: Arc<dyn ConsensusBroadcaster>,
        inbox: mpsc::Receiver<ActorInput>,
        sync_requests: mpsc::Sender<Vec<(ValidatorId, u64)>>,
        runtime: RuntimeConfig,
        sync: SyncConfig,
    ) -> (Self, watch::Receiver<NodeStatus>) {
        let (status, status_rx) = watch::channel(status_of(&manager));
        let actor = Self {
            manager,
            ledger,
            mempool,
            broadcaster,
            inbox,
            sync_requests,
            status,
            runtime,
            sync,
            syncing: false,
            sync_retry_at: None,
        };
        (actor, status_rx)
    }

    /// Run until shutdown is signalled or the inbox closes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.runtime.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut heartbeat = tokio::time::interval(self.runtime.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            validator = %short_id(&self.manager.id()),
            height = self.manager.height(),
            "[actor] consensus actor started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick().await,
                _ = heartbeat.tick() => self.on_heartbeat_timer(),
                input = self.inbox.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
            self.publish_status();
        }
        info!(validator = %short_id(&self.manager.id()), "[actor] consensus actor stopped");
    }

    async fn on_tick(&mut self) {
        if self.manager.should_propose() {
            self.propose().await;
        }
        self.drive().await;

        let expired = self.manager.expire_stale_peers();
        if !expired.is_empty() {
            debug!(count = expired.len(), "[actor] validators expired");
        }
        self.maybe_request_sync();
    }

    fn on_heartbeat_timer(&mut self) {
        self.broadcaster.broadcast(NetworkMessage::PeerHeartbeat {
            height: self.manager.committed_height(),
            voter_id: self.manager.id(),
        });
    }

    async fn propose(&mut self) {
        let batch = self
            .mempool
            .pull_batch(self.manager.config().max_block_txs)
            .await;
        let result = self
            .manager
            .prepare_candidates(batch)
            .and_then(|shards| self.manager.propose_block(shards));
        match result {
            Ok(block) => debug!(height = block.height, "[actor] proposal sent"),
            Err(ConsensusError::EmptyCandidate) => {}
            Err(e) => warn!(error = %e, "[actor] proposal failed"),
        }
    }

    async fn handle(&mut self, input: ActorInput) {
        match input {
            ActorInput::Network(envelope) => self.on_network(envelope),
            ActorInput::Sync { outcome, failed } => {
                for (peer, e) in failed {
                    self.on_sync_peer_failed(&peer, e);
                }
                self.on_sync_outcome(outcome);
            }
        }
        self.drive().await;
    }

    fn on_network(&mut self, envelope: Envelope) {
        let Envelope { from, message } = envelope;
        let result = match message {
            NetworkMessage::Proposal { round, block, .. } => self.manager.on_proposal(block, round),
            NetworkMessage::Vote(vote) => self.manager.register_vote(vote).map(|_| ()),
            NetworkMessage::PeerHeartbeat { height, voter_id } => {
                if voter_id != from {
                    warn!(peer = %short_id(&from), "[actor] heartbeat for another validator dropped");
                    return;
                }
                self.manager.on_heartbeat(&voter_id, height)
            }
            other => {
                debug!(kind = other.kind(), "[actor] message not for consensus");
                return;
            }
        };
        match result {
            Ok(()) => {}
            Err(
                e @ (ConsensusError::Expired { .. }
                | ConsensusError::FutureHeight { .. }
                | ConsensusError::FutureRound { .. }),
            ) => {
                debug!(peer = %short_id(&from), error = %e, "[actor] message outside current height");
            }
            Err(e) => warn!(peer = %short_id(&from), error = %e, "[actor] message rejected"),
        }
    }

    fn on_sync_peer_failed(&mut self, peer: &ValidatorId, e: SyncError) {
        debug!(peer = %short_id(peer), error = %e, "[actor] sync peer failed");
        let fault = e.discredits_peer().then(|| e.to_string());
        self.manager.sync_peer_failed(peer, fault);
    }

    fn on_sync_outcome(&mut self, outcome: SyncOutcome) {
        self.syncing = false;
        match outcome {
            SyncOutcome::CaughtUp { height, block_hash } => {
                match self.manager.fast_forward(height, block_hash) {
                    Ok(()) => {
                        self.mempool.evict_stale(&self.ledger.view());
                    }
                    Err(e) => {
                        warn!(error = %e, "[actor] fast-forward after sync failed");
                        self.schedule_sync_retry();
                    }
                }
            }
            SyncOutcome::Exhausted { attempts } => {
                warn!(attempts, "[actor] sync exhausted");
                self.manager.sync_exhausted();
                self.schedule_sync_retry();
            }
            SyncOutcome::NotNeeded => {
                if self.manager.participation() == Participation::Observer(ObserverReason::Syncing) {
                    self.manager.resume_voting();
                }
            }
        }
    }

    async fn drive(&mut self) {
        let outcomes = match self.manager.drive() {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!(error = %e, "[actor] consensus step failed");
                return;
            }
        };
        for outcome in outcomes {
            if let PhaseOutcome::Committed { height, .. } = outcome {
                self.on_committed(height).await;
            }
        }
    }

    async fn on_committed(&mut self, height: u64) {
        let Some(block) = self.ledger.block_at(height) else {
            return;
        };
        let hashes: Vec<Hash> = block.transactions.iter().map(|tx| tx.hash()).collect();
        self.mempool.remove_committed(&hashes).await;
        self.mempool.evict_stale(&self.ledger.view());
    }

    fn maybe_request_sync(&mut self) {
        if self.syncing {
            return;
        }
        if !self.manager.needs_sync(self.sync.staleness_threshold) {
            // The heights that sent us syncing were discounted or caught up.
            let exhausted = Participation::Observer(ObserverReason::SyncExhausted);
            if self.manager.participation() == exhausted {
                info!(height = self.manager.height(), "[actor] no longer behind, resuming voting");
                self.manager.resume_voting();
            }
            return;
        }
        if self.sync_retry_at.is_some_and(|at| Instant::now() < at) {
            return;
        }
        let candidates = self.manager.sync_candidates(self.sync.staleness_threshold);
        if candidates.is_empty() {
            return;
        }

        info!(
            local = self.manager.committed_height(),
            best = candidates[0].1,
            "[actor] behind peers, starting state sync"
        );
        match self.sync_requests.try_send(candidates) {
            Ok(()) => {
                self.manager.begin_sync();
                self.syncing = true;
            }
            Err(e) => debug!(error = %e, "[actor] sync task busy"),
        }
    }

    fn schedule_sync_retry(&mut self) {
        self.sync_retry_at = Some(Instant::now() + self.sync.fetch_timeout());
    }

    fn publish_status(&self) {
        self.status.send_replace(status_of(&self.manager));
    }
}

fn status_of(manager: &RoundManager) -> NodeStatus {
    NodeStatus {
        committed_height: manager.committed_height(),
        round: manager.current_round().round,
        phase: manager.phase(),
        participation: manager.participation(),
        faults: manager.registry().stats().faults,
        unhealthy_shards: manager.router().unhealthy_shards().len(),
    }
}
