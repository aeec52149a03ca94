//! # Mempool Adapter
//!
//! FIFO transaction pool feeding block proposals.
//!
//! Transactions stay in the pool until a committed block includes them or
//! the ledger makes them unincludable (nonce already used).

use crate::config::MempoolConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use ql_03_round_manager::MempoolGateway;
use shared_types::{short_id, Hash, LedgerView, Transaction};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Mempool admission errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    #[error("Transaction already pending")]
    Duplicate,

    #[error("Mempool full ({0} transactions)")]
    Full(usize),

    #[error("Invalid transaction signature")]
    InvalidSignature,
}

#[derive(Default)]
struct Pool {
    queue: VecDeque<Transaction>,
    hashes: HashSet<Hash>,
}

/// In-memory mempool.
pub struct InMemoryMempool {
    config: MempoolConfig,
    pool: Mutex<Pool>,
}

impl InMemoryMempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(Pool::default()),
        }
    }

    /// Admit a transaction. Returns its hash.
    pub fn submit(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        if !tx.verify() {
            return Err(MempoolError::InvalidSignature);
        }
        let hash = tx.hash();
        let mut pool = self.pool.lock();
        if pool.hashes.contains(&hash) {
            return Err(MempoolError::Duplicate);
        }
        if pool.queue.len() >= self.config.max_transactions {
            return Err(MempoolError::Full(pool.queue.len()));
        }
        pool.hashes.insert(hash);
        pool.queue.push_back(tx);
        Ok(hash)
    }

    pub fn len(&self) -> usize {
        self.pool.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.pool.lock().hashes.contains(hash)
    }

    /// Drop transactions whose nonce the ledger has already consumed.
    pub fn evict_stale(&self, view: &LedgerView) -> usize {
        let mut pool = self.pool.lock();
        let Pool { queue, hashes } = &mut *pool;
        let before = queue.len();
        queue.retain(|tx| {
            let keep = tx.nonce > view.account(&tx.sender).nonce;
            if !keep {
                hashes.remove(&tx.hash());
            }
            keep
        });
        let evicted = before - queue.len();
        if evicted > 0 {
            debug!(evicted, "[mempool] evicted stale transactions");
        }
        evicted
    }
}

#[async_trait]
impl MempoolGateway for InMemoryMempool {
    async fn pull_batch(&self, max: usize) -> Vec<Transaction> {
        self.pool.lock().queue.iter().take(max).cloned().collect()
    }

    async fn remove_committed(&self, tx_hashes: &[Hash]) {
        let committed: HashSet<&Hash> = tx_hashes.iter().collect();
        let mut pool = self.pool.lock();
        let Pool { queue, hashes } = &mut *pool;
        queue.retain(|tx| !committed.contains(&tx.hash()));
        for hash in tx_hashes {
            if hashes.remove(hash) {
                debug!(tx = %short_id(hash), "[mempool] removed committed transaction");
            }
        }
    }
}
