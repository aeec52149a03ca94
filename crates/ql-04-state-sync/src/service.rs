//! # State Sync Service
//!
//! Brings a lagging node to a peer's committed height from a verified
//! snapshot. A snapshot is applied only after its state root has been
//! recomputed from the received accounts.

use crate::config::SyncConfig;
use crate::domain::{SyncError, SyncOutcome, SyncPhase};
use crate::ports::SnapshotSource;
use shared_types::{short_id, ChainHead, LedgerStore, ValidatorId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot sync state machine.
pub struct StateSyncService {
    config: SyncConfig,
    ledger: Arc<dyn LedgerStore>,
    source: Arc<dyn SnapshotSource>,
    phase: SyncPhase,
    attempts: u32,
    last_error: Option<SyncError>,
    failed_peers: Vec<(ValidatorId, SyncError)>,
}

impl StateSyncService {
    pub fn new(
        config: SyncConfig,
        ledger: Arc<dyn LedgerStore>,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            config,
            ledger,
            source,
            phase: SyncPhase::Idle,
            attempts: 0,
            last_error: None,
            failed_peers: Vec::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Failed attempts in the last run.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    /// Every failed fetch of the last run, in attempt order.
    pub fn failed_peers(&self) -> &[(ValidatorId, SyncError)] {
        &self.failed_peers
    }

    /// Whether `peer_height` is far enough ahead of the local ledger to sync.
    pub fn is_stale(&self, peer_height: u64) -> bool {
        peer_height > self.ledger.head().height + self.config.staleness_threshold
    }

    /// Fetch, verify and apply one snapshot from `peer`.
    pub async fn sync_from(&mut self, peer: &ValidatorId) -> Result<ChainHead, SyncError> {
        let result = self.try_sync_from(peer).await;
        self.phase = SyncPhase::Idle;
        result
    }

    async fn try_sync_from(&mut self, peer: &ValidatorId) -> Result<ChainHead, SyncError> {
        let min_height = self.ledger.head().height + 1;

        self.phase = SyncPhase::RequestingSnapshot;
        debug!(peer = %short_id(peer), min_height, "[sync] requesting snapshot");
        let fetch = self.source.fetch_snapshot(peer, min_height);
        let snapshot = tokio::time::timeout(self.config.fetch_timeout(), fetch)
            .await
            .map_err(|_| SyncError::Timeout(self.config.fetch_timeout_ms))??
            .ok_or(SyncError::NoSnapshot)?;

        self.phase = SyncPhase::VerifyingSnapshot;
        if snapshot.height < min_height {
            return Err(SyncError::TooOld {
                got: snapshot.height,
                min: min_height,
            });
        }
        if !snapshot.verify_root() {
            return Err(SyncError::RootMismatch {
                height: snapshot.height,
            });
        }

        self.phase = SyncPhase::ApplyingSnapshot;
        let head = self.ledger.restore(snapshot)?;
        info!(peer = %short_id(peer), height = head.height, "[sync] snapshot applied");
        Ok(head)
    }

    /// Try `candidates` in order, wrapping around, until one snapshot applies
    /// or `max_attempts` fetches have failed.
    ///
    /// Candidates at or below the staleness threshold are skipped.
    pub async fn run(&mut self, candidates: &[(ValidatorId, u64)]) -> SyncOutcome {
        self.attempts = 0;
        self.last_error = None;
        self.failed_peers.clear();

        let peers: Vec<ValidatorId> = candidates
            .iter()
            .filter(|(_, height)| self.is_stale(*height))
            .map(|(peer, _)| *peer)
            .collect();
        if peers.is_empty() {
            self.last_error = Some(SyncError::NoCandidates);
            return SyncOutcome::NotNeeded;
        }

        for peer in peers.iter().cycle() {
            if self.attempts >= self.config.max_attempts {
                break;
            }
            match self.sync_from(peer).await {
                Ok(head) => {
                    return SyncOutcome::CaughtUp {
                        height: head.height,
                        block_hash: head.hash,
                    }
                }
                Err(e) => {
                    self.attempts += 1;
                    warn!(
                        peer = %short_id(peer),
                        attempt = self.attempts,
                        error = %e,
                        "[sync] snapshot attempt failed"
                    );
                    self.failed_peers.push((*peer, e.clone()));
                    self.last_error = Some(e);
                }
            }
        }

        warn!(attempts = self.attempts, "[sync] no verifiable snapshot, giving up");
        SyncOutcome::Exhausted {
            attempts: self.attempts,
        }
    }
}
