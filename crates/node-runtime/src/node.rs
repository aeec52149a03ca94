//! # Validator Node
//!
//! Wires one validator: ledger, mempool, network endpoint, round manager and
//! the three tasks that drive them.
//!
//! ```text
//!  network ──→ inbound task ──┬── SnapshotRequest ──→ served from the ledger
//!                             ├── SnapshotResponse ─→ NetworkSnapshotSource
//!                             └── everything else ──→ ConsensusActor
//!
//!  ConsensusActor ──candidates──→ sync task ──SyncOutcome──→ ConsensusActor
//! ```
//!
//! [`Devnet`] starts a whole validator set on one in-process network.

use crate::actor::{ActorInput, ConsensusActor, NodeStatus};
use crate::adapters::{
    InMemoryMempool, InProcessNetwork, MempoolError, NetworkEndpoint, NetworkSnapshotSource,
    TokioTimeSource,
};
use crate::config::{ConfigError, NodeConfig};
use crate::genesis::DevnetGenesis;
use ql_01_peer_registry::{PeerRegistry, RegistryError};
use ql_03_round_manager::{RoundDependencies, RoundManager, TimeSource};
use ql_04_state_sync::StateSyncService;
use ql_05_shard_router::{ShardError, ShardRouter};
use shared_types::{
    short_id, Envelope, Hash, InMemoryLedgerStore, LedgerStore, NetworkMessage, PeerTransport,
    Transaction, ValidatorId, ValidatorKeyPair,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Node startup errors.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shard router error: {0}")]
    Shard(#[from] ShardError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// A running validator.
pub struct ValidatorNode {
    id: ValidatorId,
    ledger: Arc<InMemoryLedgerStore>,
    mempool: Arc<InMemoryMempool>,
    status: watch::Receiver<NodeStatus>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ValidatorNode {
    /// Build the node from genesis and spawn its tasks on the current
    /// tokio runtime.
    pub fn spawn(
        config: &NodeConfig,
        keypair: ValidatorKeyPair,
        genesis: &DevnetGenesis,
        network: &Arc<InProcessNetwork>,
    ) -> Result<Self, NodeError> {
        let id = keypair.public_key();
        let clock = Arc::new(TokioTimeSource::new());
        let ledger = Arc::new(InMemoryLedgerStore::new(genesis.allocation.clone()));
        let mempool = Arc::new(InMemoryMempool::new(config.mempool.clone()));
        let (endpoint, network_rx) = network.join(id);
        let endpoint = Arc::new(endpoint);

        let mut registry = PeerRegistry::new(config.registry.clone());
        let now = clock.now();
        for (validator, power) in genesis.validator_set() {
            registry.register(validator, power, now)?;
        }
        let router = ShardRouter::new(config.shard.clone())?;
        let deps = RoundDependencies {
            ledger: ledger.clone(),
            broadcaster: endpoint.clone(),
            clock,
        };
        let manager = RoundManager::new(config.round.clone(), keypair, registry, router, deps);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (actor_tx, actor_rx) = mpsc::channel(config.runtime.inbox_capacity);
        let (sync_tx, sync_rx) = mpsc::channel(1);

        let (actor, status) = ConsensusActor::new(
            manager,
            ledger.clone(),
            mempool.clone(),
            endpoint.clone(),
            actor_rx,
            sync_tx,
            config.runtime.clone(),
            config.sync.clone(),
        );

        let snapshots = Arc::new(NetworkSnapshotSource::new(endpoint.clone()));
        let sync = StateSyncService::new(config.sync.clone(), ledger.clone(), snapshots.clone());

        let inbound = InboundTask {
            endpoint: Arc::clone(&endpoint),
            ledger: ledger.clone(),
            snapshots,
            actor: actor_tx.clone(),
        };

        let tasks = vec![
            tokio::spawn(actor.run(shutdown_rx.clone())),
            tokio::spawn(inbound.run(network_rx, shutdown_rx.clone())),
            tokio::spawn(run_sync(sync, sync_rx, actor_tx, shutdown_rx)),
        ];
        info!(validator = %short_id(&id), "[node] validator started");

        Ok(Self {
            id,
            ledger,
            mempool,
            status,
            shutdown,
            tasks,
        })
    }

    pub fn id(&self) -> ValidatorId {
        self.id
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedgerStore> {
        &self.ledger
    }

    pub fn mempool(&self) -> &Arc<InMemoryMempool> {
        &self.mempool
    }

    /// Latest status published by the consensus actor.
    pub fn status(&self) -> NodeStatus {
        *self.status.borrow()
    }

    /// Receiver notified after every actor step.
    pub fn subscribe(&self) -> watch::Receiver<NodeStatus> {
        self.status.clone()
    }

    pub fn committed_height(&self) -> u64 {
        self.ledger.head().height
    }

    pub fn submit(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        self.mempool.submit(tx)
    }

    /// Signal every task to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "[node] task ended abnormally");
            }
        }
        info!(validator = %short_id(&self.id), "[node] validator stopped");
    }
}

/// Routes inbound network traffic.
struct InboundTask {
    endpoint: Arc<NetworkEndpoint>,
    ledger: Arc<InMemoryLedgerStore>,
    snapshots: Arc<NetworkSnapshotSource>,
    actor: mpsc::Sender<ActorInput>,
}

impl InboundTask {
    async fn run(self, mut network: mpsc::Receiver<Envelope>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                envelope = network.recv() => match envelope {
                    Some(envelope) => self.route(envelope).await,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn route(&self, envelope: Envelope) {
        match envelope.message {
            NetworkMessage::SnapshotRequest { request_id, height } => {
                let snapshot = self.ledger.snapshot();
                let snapshot = (snapshot.height >= height).then_some(snapshot);
                debug!(
                    peer = %short_id(&envelope.from),
                    height,
                    served = snapshot.is_some(),
                    "[node] snapshot request"
                );
                let reply = NetworkMessage::SnapshotResponse {
                    request_id,
                    snapshot,
                };
                if let Err(e) = PeerTransport::send(&*self.endpoint, &envelope.from, reply).await {
                    debug!(error = %e, "[node] snapshot response not sent");
                }
            }
            NetworkMessage::SnapshotResponse {
                request_id,
                snapshot,
            } => self.snapshots.complete(request_id, snapshot),
            message => {
                let input = ActorInput::Network(Envelope {
                    from: envelope.from,
                    message,
                });
                if let Err(mpsc::error::TrySendError::Full(_)) = self.actor.try_send(input) {
                    warn!(peer = %short_id(&envelope.from), "[node] consensus inbox full, dropping message");
                }
            }
        }
    }
}

async fn run_sync(
    mut service: StateSyncService,
    mut requests: mpsc::Receiver<Vec<(ValidatorId, u64)>>,
    actor: mpsc::Sender<ActorInput>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let candidates = tokio::select! {
            candidates = requests.recv() => match candidates {
                Some(candidates) => candidates,
                None => break,
            },
            _ = shutdown.changed() => break,
        };
        let outcome = tokio::select! {
            outcome = service.run(&candidates) => outcome,
            _ = shutdown.changed() => break,
        };
        let failed = service.failed_peers().to_vec();
        if actor.send(ActorInput::Sync { outcome, failed }).await.is_err() {
            break;
        }
    }
}

/// A full validator set on one in-process network.
pub struct Devnet {
    config: NodeConfig,
    genesis: DevnetGenesis,
    network: Arc<InProcessNetwork>,
    nodes: Vec<ValidatorNode>,
}

impl Devnet {
    /// Build genesis from `config.devnet` and start every validator.
    pub fn start(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let genesis = DevnetGenesis::build(&config.devnet);
        let network = InProcessNetwork::new(config.network.clone());
        let nodes = genesis
            .validators
            .iter()
            .map(|key| ValidatorNode::spawn(&config, key.clone(), &genesis, &network))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            validators = nodes.len(),
            shards = config.shard.shard_count,
            "[node] devnet started"
        );
        Ok(Self {
            config,
            genesis,
            network,
            nodes,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn genesis(&self) -> &DevnetGenesis {
        &self.genesis
    }

    pub fn network(&self) -> &Arc<InProcessNetwork> {
        &self.network
    }

    pub fn nodes(&self) -> &[ValidatorNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ValidatorNode> {
        self.nodes.get(index)
    }

    /// Hand a transaction to every connected node's mempool.
    ///
    /// Returns how many mempools admitted it.
    pub fn submit(&self, tx: &Transaction) -> usize {
        self.nodes
            .iter()
            .filter(|node| self.network.is_connected(&node.id))
            .filter(|node| match node.submit(tx.clone()) {
                Ok(_) => true,
                Err(e) => {
                    debug!(validator = %short_id(&node.id), error = %e, "[node] transaction not admitted");
                    false
                }
            })
            .count()
    }

    pub fn disconnect(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            self.network.disconnect(&node.id);
        }
    }

    pub fn reconnect(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            self.network.reconnect(&node.id);
        }
    }

    /// Committed height of every node, in startup order.
    pub fn committed_heights(&self) -> Vec<u64> {
        self.nodes.iter().map(ValidatorNode::committed_height).collect()
    }

    pub async fn shutdown(self) {
        for node in self.nodes {
            node.shutdown().await;
        }
        info!("[node] devnet stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_height(devnet: &Devnet, height: u64) {
        tokio::time::timeout(Duration::from_secs(30), async {
            while devnet.committed_heights().iter().any(|h| *h < height) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("devnet did not reach height");
    }

    #[tokio::test(start_paused = true)]
    async fn test_devnet_commits_transactions() {
        let devnet = Devnet::start(NodeConfig::for_testing()).unwrap();
        let sender = &devnet.genesis().accounts[0];
        let to = devnet.genesis().accounts[1].address();
        let tx = Transaction::signed(sender, to, 25, 1);
        assert_eq!(devnet.submit(&tx), 4);

        wait_for_height(&devnet, 1).await;
        // Every node agrees on the block at height 1.
        let hashes: Vec<_> = devnet
            .nodes()
            .iter()
            .map(|n| n.ledger().block_at(1).unwrap().hash)
            .collect();
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));

        let view = devnet.node(0).unwrap().ledger().view();
        assert_eq!(view.account(&to).balance, 1_025);
        assert_eq!(view.account(&sender.address()).nonce, 1);
        assert!(devnet.nodes().iter().all(|n| n.status().unhealthy_shards == 0));
        devnet.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected() {
        let mut config = NodeConfig::for_testing();
        config.devnet.validators = 0;
        assert!(matches!(Devnet::start(config), Err(NodeError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_request_served_from_ledger() {
        let config = NodeConfig::for_testing();
        let genesis = DevnetGenesis::build(&config.devnet);
        let network = InProcessNetwork::new(config.network.clone());
        let node = ValidatorNode::spawn(&config, genesis.validators[0].clone(), &genesis, &network)
            .unwrap();
        let asker = ValidatorKeyPair::from_seed([0x77; 32]).public_key();
        let (endpoint, mut inbox) = network.join(asker);

        let request_id = uuid::Uuid::new_v4();
        PeerTransport::send(
            &endpoint,
            &node.id(),
            NetworkMessage::SnapshotRequest {
                request_id,
                height: 0,
            },
        )
        .await
        .unwrap();

        let snapshot = loop {
            let envelope = inbox.recv().await.unwrap();
            if let NetworkMessage::SnapshotResponse { request_id: id, snapshot } = envelope.message {
                assert_eq!(id, request_id);
                break snapshot;
            }
        };
        let snapshot = snapshot.unwrap();
        assert!(snapshot.verify_root());
        assert_eq!(snapshot.accounts, genesis.allocation);
        node.shutdown().await;
    }
}
