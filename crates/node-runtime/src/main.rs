//! # Quorum-Ledger Devnet
//!
//! Starts an in-process validator set, feeds it random transfers and logs
//! every height it commits until Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`QL_CONFIG` file, then `QL_*` overrides)
//! 2. Build the devnet genesis
//! 3. Spawn every validator
//! 4. Run the load generator

use anyhow::{Context, Result};
use node_runtime::{Devnet, DevnetGenesis, NodeConfig};
use rand::Rng;
use shared_types::{short_id, LedgerStore, Transaction};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Random transfers between the funded genesis accounts.
struct LoadGenerator {
    next_nonce: Vec<u64>,
}

impl LoadGenerator {
    fn new(genesis: &DevnetGenesis) -> Self {
        Self {
            next_nonce: vec![1; genesis.accounts.len()],
        }
    }

    /// Submit one transfer. Nonces only advance when a mempool admitted it.
    fn submit_one(&mut self, devnet: &Devnet) {
        let accounts = &devnet.genesis().accounts;
        if accounts.len() < 2 {
            return;
        }
        let mut rng = rand::thread_rng();
        let from = rng.gen_range(0..accounts.len());
        let to = (from + rng.gen_range(1..accounts.len())) % accounts.len();
        let amount = rng.gen_range(1..=100);

        // Resync with the ledger in case a transaction was evicted.
        if let Some(node) = devnet.node(0) {
            let committed = node.ledger().view().account(&accounts[from].address()).nonce;
            self.next_nonce[from] = self.next_nonce[from].max(committed + 1);
        }

        let tx = Transaction::signed(
            &accounts[from],
            accounts[to].address(),
            amount,
            self.next_nonce[from],
        );
        if devnet.submit(&tx) > 0 {
            debug!(tx = %short_id(&tx.hash()), from, to, amount, "[load] transfer submitted");
            self.next_nonce[from] += 1;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    info!("===========================================");
    info!("  Quorum-Ledger Devnet v{}", node_runtime::VERSION);
    info!("===========================================");
    info!(
        validators = config.devnet.validators,
        shards = config.shard.shard_count,
        accounts = config.devnet.accounts,
        "Starting devnet"
    );

    let tx_interval = config.devnet.tx_interval_ms;
    let devnet = Devnet::start(config).context("Failed to start devnet")?;
    let mut load = LoadGenerator::new(devnet.genesis());
    let mut status = devnet
        .node(0)
        .map(|node| node.subscribe())
        .context("Devnet has no validators")?;
    let mut last_height = 0;

    let mut ticker = tokio::time::interval(Duration::from_millis(tx_interval.max(1)));
    info!("Devnet is running. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            _ = ticker.tick(), if tx_interval > 0 => load.submit_one(&devnet),
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let height = status.borrow_and_update().committed_height;
                if height > last_height {
                    last_height = height;
                    if let Some(block) = devnet.node(0).and_then(|node| node.ledger().block_at(height)) {
                        info!(
                            height,
                            round = block.round,
                            txs = block.transactions.len(),
                            hash = %short_id(&block.hash),
                            "Block committed"
                        );
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    info!("Initiating graceful shutdown...");
    devnet.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
