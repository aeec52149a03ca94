//! # Ledger Store
//!
//! Committed chain and account state behind a single-writer interface.
//!
//! Readers take an [`Arc<LedgerView>`] and never observe a half-applied
//! block or a half-restored snapshot: every write builds a new view and
//! swaps it in under the lock.

use crate::entities::{Block, ChainHead, Hash, StateSnapshot};
use crate::errors::StorageError;
use crate::state::{apply_block, compute_state_root, AccountSet};
use crate::AccountState;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable view of the ledger at one height.
#[derive(Debug, Clone)]
pub struct LedgerView {
    /// Last committed block.
    pub head: ChainHead,
    /// Account state after `head`.
    pub accounts: AccountSet,
    /// Root over `accounts`.
    pub state_root: Hash,
}

impl LedgerView {
    /// Account state, or the zero account.
    pub fn account(&self, address: &crate::Address) -> AccountState {
        self.accounts.get(address).copied().unwrap_or_default()
    }
}

/// Ledger storage port.
///
/// Only the consensus actor and the sync service write.
pub trait LedgerStore: Send + Sync {
    /// Current head.
    fn head(&self) -> ChainHead;

    /// Consistent read view.
    fn view(&self) -> Arc<LedgerView>;

    /// Append a block at `head + 1`.
    ///
    /// Committing the block already at head (same hash) is a no-op.
    fn commit(&self, block: &Block) -> Result<ChainHead, StorageError>;

    /// Committed block at `height`, if retained.
    fn block_at(&self, height: u64) -> Option<Block>;

    /// Snapshot of current state.
    fn snapshot(&self) -> StateSnapshot;

    /// Replace local state with a verified snapshot, atomically.
    fn restore(&self, snapshot: StateSnapshot) -> Result<ChainHead, StorageError>;
}

struct LedgerInner {
    view: Arc<LedgerView>,
    blocks: BTreeMap<u64, Block>,
}

/// In-memory ledger. Used by the node runtime and tests.
pub struct InMemoryLedgerStore {
    inner: RwLock<LedgerInner>,
    unavailable: AtomicBool,
}

impl InMemoryLedgerStore {
    /// Create a ledger with the given genesis allocation.
    pub fn new(genesis_accounts: AccountSet) -> Self {
        let genesis = Block::genesis(0);
        let view = LedgerView {
            head: ChainHead {
                height: 0,
                hash: genesis.hash,
            },
            state_root: compute_state_root(&genesis_accounts),
            accounts: genesis_accounts,
        };
        let mut blocks = BTreeMap::new();
        blocks.insert(0, genesis);
        Self {
            inner: RwLock::new(LedgerInner {
                view: Arc::new(view),
                blocks,
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("write refused".into()));
        }
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn head(&self) -> ChainHead {
        self.inner.read().view.head
    }

    fn view(&self) -> Arc<LedgerView> {
        Arc::clone(&self.inner.read().view)
    }

    fn commit(&self, block: &Block) -> Result<ChainHead, StorageError> {
        self.check_available()?;
        let mut inner = self.inner.write();
        let head = inner.view.head;

        if block.height == head.height && block.hash == head.hash {
            debug!(height = block.height, "[ledger] block already committed");
            return Ok(head);
        }
        if block.height != head.height + 1 {
            return Err(StorageError::NotNextHeight {
                height: block.height,
                head: head.height,
            });
        }
        if block.previous_hash != head.hash {
            return Err(StorageError::ParentMismatch {
                height: block.height,
            });
        }

        let accounts = apply_block(&inner.view.accounts, &block.transactions)?;
        let new_head = ChainHead {
            height: block.height,
            hash: block.hash,
        };
        inner.view = Arc::new(LedgerView {
            head: new_head,
            state_root: compute_state_root(&accounts),
            accounts,
        });
        inner.blocks.insert(block.height, block.clone());
        Ok(new_head)
    }

    fn block_at(&self, height: u64) -> Option<Block> {
        self.inner.read().blocks.get(&height).cloned()
    }

    fn snapshot(&self) -> StateSnapshot {
        let view = self.view();
        StateSnapshot {
            height: view.head.height,
            block_hash: view.head.hash,
            state_root: view.state_root,
            accounts: view.accounts.clone(),
        }
    }

    fn restore(&self, snapshot: StateSnapshot) -> Result<ChainHead, StorageError> {
        self.check_available()?;
        let mut inner = self.inner.write();
        let local = inner.view.head.height;
        if snapshot.height <= local {
            return Err(StorageError::StaleSnapshot {
                snapshot: snapshot.height,
                local,
            });
        }

        let head = snapshot.head();
        inner.view = Arc::new(LedgerView {
            head,
            state_root: snapshot.state_root,
            accounts: snapshot.accounts,
        });
        // Bodies below the snapshot are not available locally any more.
        inner.blocks.clear();
        info!(height = head.height, "[ledger] restored from snapshot");
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ValidatorKeyPair;
    use crate::entities::{Transaction, ZERO_HASH};

    fn setup() -> (ValidatorKeyPair, InMemoryLedgerStore) {
        let kp = ValidatorKeyPair::from_seed([4; 32]);
        let mut accounts = AccountSet::new();
        accounts.insert(kp.address(), AccountState { balance: 1_000, nonce: 0 });
        (kp, InMemoryLedgerStore::new(accounts))
    }

    fn next_block(store: &InMemoryLedgerStore, txs: Vec<Transaction>) -> Block {
        let head = store.head();
        Block::new(head.height + 1, head.hash, 0, [1u8; 32], 0, ZERO_HASH, txs)
    }

    #[test]
    fn test_commit_advances_head() {
        let (kp, store) = setup();
        let tx = Transaction::signed(&kp, [3u8; 20], 100, 1);
        let block = next_block(&store, vec![tx]);

        let head = store.commit(&block).unwrap();
        assert_eq!(head.height, 1);
        assert_eq!(store.view().account(&kp.address()).balance, 900);
        assert_eq!(store.block_at(1), Some(block));
    }

    #[test]
    fn test_commit_same_block_twice_is_noop() {
        let (kp, store) = setup();
        let block = next_block(&store, vec![Transaction::signed(&kp, [3u8; 20], 100, 1)]);

        store.commit(&block).unwrap();
        let root = store.view().state_root;
        store.commit(&block).unwrap();

        assert_eq!(store.head().height, 1);
        assert_eq!(store.view().state_root, root);
    }

    #[test]
    fn test_commit_rejects_gap() {
        let (_, store) = setup();
        let head = store.head();
        let block = Block::new(2, head.hash, 0, [1u8; 32], 0, ZERO_HASH, vec![]);
        assert!(matches!(store.commit(&block), Err(StorageError::NotNextHeight { .. })));
    }

    #[test]
    fn test_failed_transition_leaves_state() {
        let (kp, store) = setup();
        let before = store.view();
        let block = next_block(&store, vec![Transaction::signed(&kp, [3u8; 20], 5_000, 1)]);

        assert!(store.commit(&block).is_err());
        assert_eq!(store.head(), before.head);
        assert_eq!(store.view().state_root, before.state_root);
    }

    #[test]
    fn test_unavailable_store_refuses_writes() {
        let (_, store) = setup();
        store.set_unavailable(true);
        let block = next_block(&store, vec![]);
        assert!(matches!(store.commit(&block), Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn test_restore_replaces_state() {
        let (kp, store) = setup();
        let mut accounts = AccountSet::new();
        accounts.insert(kp.address(), AccountState { balance: 7, nonce: 3 });
        let snapshot = StateSnapshot::new(10, [9u8; 32], accounts);

        let head = store.restore(snapshot.clone()).unwrap();
        assert_eq!(head.height, 10);
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_rejects_stale_snapshot() {
        let (_, store) = setup();
        let snapshot = StateSnapshot::new(0, [9u8; 32], AccountSet::new());
        assert!(matches!(store.restore(snapshot), Err(StorageError::StaleSnapshot { .. })));
    }
}
