//! Shared helpers for the integration scenarios.

use node_runtime::{Devnet, NodeConfig};
use shared_types::{LedgerStore, Transaction};
use std::time::Duration;

/// Virtual time allowed for any single wait.
const WAIT_LIMIT: Duration = Duration::from_secs(60);

/// Poll `condition` until it holds; panics after [`WAIT_LIMIT`].
pub async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let polled = tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if polled.is_err() {
        panic!("timed out waiting for {what}");
    }
}

/// Wait until the nodes at `indices` have committed `height`.
pub async fn wait_for_height(devnet: &Devnet, indices: &[usize], height: u64) {
    wait_until(&format!("height {height} on nodes {indices:?}"), || {
        indices
            .iter()
            .filter_map(|i| devnet.node(*i))
            .all(|node| node.committed_height() >= height)
    })
    .await;
}

pub fn devnet() -> Devnet {
    Devnet::start(NodeConfig::for_testing()).unwrap()
}

/// Transfer between genesis accounts `from` and `to`.
pub fn transfer(devnet: &Devnet, from: usize, to: usize, amount: u64, nonce: u64) -> Transaction {
    let accounts = &devnet.genesis().accounts;
    Transaction::signed(&accounts[from], accounts[to].address(), amount, nonce)
}

/// Assert every listed node holds the same block at `height`.
pub fn assert_same_block(devnet: &Devnet, indices: &[usize], height: u64) {
    let hashes: Vec<_> = indices
        .iter()
        .map(|i| devnet.node(*i).unwrap().ledger().block_at(height).unwrap().hash)
        .collect();
    assert!(
        hashes.windows(2).all(|w| w[0] == w[1]),
        "nodes disagree at height {height}"
    );
}
