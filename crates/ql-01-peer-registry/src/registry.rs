//! # Peer Registry
//!
//! Known validators, their voting power and liveness.
//!
//! Entries live in an arena (`Vec<PeerInfo>`) addressed through an id lookup.
//! Nothing is ever removed: retired and expired validators stay for the
//! fault log and statistics.

use crate::config::RegistryConfig;
use crate::domain::{FaultEvidence, FaultRecord, PeerInfo, RegistryError, VotingSet};
use shared_types::{short_id, Timestamp, ValidatorId};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Registry of validators.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    config: RegistryConfig,
    peers: Vec<PeerInfo>,
    lookup: HashMap<ValidatorId, usize>,
    faults: HashMap<ValidatorId, Vec<FaultRecord>>,
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered: usize,
    pub active: usize,
    pub retired: usize,
    pub active_power: u64,
    pub faults: usize,
}

impl PeerRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            peers: Vec::new(),
            lookup: HashMap::new(),
            faults: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Add a validator.
    pub fn register(
        &mut self,
        id: ValidatorId,
        voting_power: u64,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        if voting_power < self.config.min_voting_power {
            return Err(RegistryError::InsufficientVotingPower {
                power: voting_power,
                min: self.config.min_voting_power,
            });
        }
        if self.lookup.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        self.lookup.insert(id, self.peers.len());
        self.peers.push(PeerInfo::new(id, voting_power, now));
        info!(peer = %short_id(&id), voting_power, "[registry] validator registered");
        Ok(())
    }

    /// Change a validator's voting power. Takes effect at the next height.
    pub fn update_voting_power(
        &mut self,
        id: &ValidatorId,
        voting_power: u64,
    ) -> Result<(), RegistryError> {
        let min = self.config.min_voting_power;
        let peer = self.peer_mut(id)?;
        if peer.retired {
            return Err(RegistryError::Retired(*id));
        }
        if voting_power < min {
            return Err(RegistryError::InsufficientVotingPower {
                power: voting_power,
                min,
            });
        }
        peer.voting_power = voting_power;
        Ok(())
    }

    /// Stop a validator from voting for good. History is kept.
    pub fn retire(&mut self, id: &ValidatorId) -> Result<(), RegistryError> {
        let peer = self.peer_mut(id)?;
        peer.retired = true;
        peer.active = false;
        info!(peer = %short_id(id), "[registry] validator retired");
        Ok(())
    }

    /// Liveness and height announcement. Reactivates an expired validator.
    pub fn heartbeat(
        &mut self,
        id: &ValidatorId,
        height: u64,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let peer = self.peer_mut(id)?;
        peer.last_known_height = peer.last_known_height.max(height);
        peer.last_seen = peer.last_seen.max(now);
        if !peer.active && !peer.retired {
            peer.active = true;
            debug!(peer = %short_id(id), height, "[registry] validator reactivated");
        }
        Ok(())
    }

    /// A vote from `id` was received.
    pub fn record_vote_seen(&mut self, id: &ValidatorId, now: Timestamp) -> Result<(), RegistryError> {
        let peer = self.peer_mut(id)?;
        peer.last_seen = peer.last_seen.max(now);
        peer.stats.votes_counted += 1;
        Ok(())
    }

    /// A block proposed by `id` was committed.
    pub fn record_block_proposed(&mut self, id: &ValidatorId) -> Result<(), RegistryError> {
        self.peer_mut(id)?.stats.blocks_proposed += 1;
        Ok(())
    }

    /// Deactivate validators silent for longer than the liveness timeout.
    ///
    /// Returns the ids that were deactivated by this call.
    pub fn expire_stale(&mut self, now: Timestamp) -> Vec<ValidatorId> {
        let timeout = self.config.liveness_timeout_ms;
        let mut expired = Vec::new();
        for peer in self.peers.iter_mut().filter(|p| p.active) {
            if now.saturating_sub(peer.last_seen) > timeout {
                peer.active = false;
                expired.push(peer.id);
            }
        }
        for id in &expired {
            warn!(peer = %short_id(id), "[registry] validator liveness expired");
        }
        expired
    }

    /// Append a fault to the validator's log. Returns its fault count.
    pub fn record_fault(
        &mut self,
        id: &ValidatorId,
        evidence: FaultEvidence,
        now: Timestamp,
    ) -> Result<usize, RegistryError> {
        if !self.lookup.contains_key(id) {
            return Err(RegistryError::UnknownValidator(*id));
        }
        warn!(peer = %short_id(id), height = evidence.height(), ?evidence, "[registry] fault recorded");
        let log = self.faults.entry(*id).or_default();
        log.push(FaultRecord {
            evidence,
            recorded_at: now,
        });
        Ok(log.len())
    }

    /// Faults recorded against `id`, oldest first.
    pub fn faults_of(&self, id: &ValidatorId) -> &[FaultRecord] {
        self.faults.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: &ValidatorId) -> Option<&PeerInfo> {
        self.lookup.get(id).map(|&i| &self.peers[i])
    }

    /// All entries, registration order.
    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// Power of every non-retired validator, live or not.
    pub fn registered_power(&self) -> u64 {
        self.peers
            .iter()
            .filter(|p| !p.retired)
            .map(|p| p.voting_power)
            .sum()
    }

    /// Freeze the active validators into a voting set.
    pub fn voting_set(&self) -> VotingSet {
        let registered_power = self.registered_power();
        VotingSet::with_registered_power(
            self.peers
                .iter()
                .filter(|p| p.is_voting())
                .map(|p| (p.id, p.voting_power))
                .collect(),
            registered_power,
        )
    }

    /// Freeze every non-retired validator, live or not, for proposer
    /// rotation. Unlike [`voting_set`](Self::voting_set) this does not depend
    /// on the local liveness view, so all nodes rotate proposers alike.
    pub fn proposer_set(&self) -> VotingSet {
        VotingSet::new(
            self.peers
                .iter()
                .filter(|p| !p.retired)
                .map(|p| (p.id, p.voting_power))
                .collect(),
        )
    }

    /// Highest height announced by any validator.
    pub fn max_peer_height(&self) -> u64 {
        self.peers
            .iter()
            .map(|p| p.last_known_height)
            .max()
            .unwrap_or(0)
    }

    /// Validators more than `threshold` blocks ahead of `local`, highest first.
    pub fn peers_ahead_of(&self, local: u64, threshold: u64) -> Vec<(ValidatorId, u64)> {
        let mut ahead: Vec<_> = self
            .peers
            .iter()
            .filter(|p| !p.retired && p.last_known_height > local.saturating_add(threshold))
            .map(|p| (p.id, p.last_known_height))
            .collect();
        ahead.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ahead
    }

    /// Whether validators holding more than a third of the registered power
    /// report heights more than `threshold` past `local`.
    ///
    /// Up to a third may be faulty, so fewer claims prove nothing.
    pub fn needs_sync(&self, local: u64, threshold: u64) -> bool {
        let ahead = self.peers_ahead_of(local, threshold);
        self.exceeds_fault_bound(ahead.iter().map(|(id, _)| id))
    }

    /// Whether `ids` together hold more than a third of the registered
    /// power. Unknown and retired ids count for nothing.
    pub fn exceeds_fault_bound<'a>(&self, ids: impl IntoIterator<Item = &'a ValidatorId>) -> bool {
        let power: u128 = ids
            .into_iter()
            .filter_map(|id| self.get(id))
            .filter(|p| !p.retired)
            .map(|p| p.voting_power as u128)
            .sum();
        power > 0 && power * 3 > self.registered_power() as u128
    }

    /// Lower the height `id` last announced to at most `height`, after its
    /// claim could not be backed by a snapshot. Returns the discarded claim.
    pub fn discount_height(&mut self, id: &ValidatorId, height: u64) -> Result<u64, RegistryError> {
        let peer = self.peer_mut(id)?;
        let claimed = peer.last_known_height;
        peer.last_known_height = claimed.min(height);
        if claimed > height {
            debug!(peer = %short_id(id), claimed, height, "[registry] announced height discounted");
        }
        Ok(claimed)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.peers.len(),
            active: self.peers.iter().filter(|p| p.is_voting()).count(),
            retired: self.peers.iter().filter(|p| p.retired).count(),
            active_power: self
                .peers
                .iter()
                .filter(|p| p.is_voting())
                .map(|p| p.voting_power)
                .sum(),
            faults: self.faults.values().map(Vec::len).sum(),
        }
    }

    fn peer_mut(&mut self, id: &ValidatorId) -> Result<&mut PeerInfo, RegistryError> {
        let index = *self
            .lookup
            .get(id)
            .ok_or(RegistryError::UnknownValidator(*id))?;
        Ok(&mut self.peers[index])
    }
}
