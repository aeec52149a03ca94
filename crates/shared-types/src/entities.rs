//! # Core Domain Entities
//!
//! Defines the ledger entities shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `Transaction`
//! - **Consensus**: `Vote`, `VoteKind`, `Phase`, `CommitCertificate`
//! - **State**: `AccountState`, `StateSnapshot`, `ChainHead`

use crate::crypto::{address_from_public_key, verify_signature, ValidatorKeyPair};
use crate::state::{compute_state_root, AccountSet};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte hash (SHA-256 or Keccak-256).
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte account address, derived from the owner's public key.
pub type Address = [u8; 20];

/// Validator identity. The validator's Ed25519 verifying key.
pub type ValidatorId = PublicKey;

/// Milliseconds on a monotonic clock (or a virtual clock in tests).
pub type Timestamp = u64;

/// The all-zero hash used as genesis parent.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Short hex prefix of an identifier, for logs.
pub fn short_id(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// A value transfer between two accounts.
///
/// Immutable once signed. Included in exactly one committed block; the nonce
/// check in [`apply_transaction`](crate::state::apply_transaction) rejects replays.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address (derived from `sender_key`).
    pub sender: Address,
    /// Sender's public key, used to verify `signature`.
    pub sender_key: PublicKey,
    /// Recipient address.
    pub receiver: Address,
    /// Amount in base units.
    pub amount: u64,
    /// Sender nonce; must be exactly one above the account's current nonce.
    pub nonce: u64,
    /// Ed25519 signature over [`Transaction::signing_bytes`].
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Transaction {
    /// Build and sign a transfer from `keypair`'s account.
    pub fn signed(keypair: &ValidatorKeyPair, receiver: Address, amount: u64, nonce: u64) -> Self {
        let sender_key = keypair.public_key();
        let mut tx = Self {
            sender: address_from_public_key(&sender_key),
            sender_key,
            receiver,
            amount,
            nonce,
            signature: [0u8; 64],
        };
        tx.signature = keypair.sign(&tx.signing_bytes());
        tx
    }

    /// Bytes covered by the sender's signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(20 + 32 + 20 + 16 + 8);
        bytes.extend_from_slice(b"ql-tx");
        bytes.extend_from_slice(&self.sender);
        bytes.extend_from_slice(&self.sender_key);
        bytes.extend_from_slice(&self.receiver);
        bytes.extend_from_slice(&self.amount.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    /// Transaction hash. The signature is not part of it.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.sender);
        hasher.update(self.receiver);
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.finalize().into()
    }

    /// Key used for shard routing.
    pub fn shard_key(&self) -> &Address {
        &self.sender
    }

    /// Check that `sender` matches `sender_key` and the signature verifies.
    pub fn verify(&self) -> bool {
        address_from_public_key(&self.sender_key) == self.sender
            && verify_signature(&self.sender_key, &self.signing_bytes(), &self.signature)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("sender", &short_id(&self.sender))
            .field("receiver", &short_id(&self.receiver))
            .field("amount", &self.amount)
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// A proposed or committed block.
///
/// The hash is computed once in [`Block::new`]; every receiver re-checks it
/// with [`Block::has_valid_hash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height in the chain (genesis is 0).
    pub height: u64,
    /// Hash of the block committed at `height - 1`.
    pub previous_hash: Hash,
    /// Round in which the block was proposed.
    pub round: u32,
    /// Validator that proposed the block.
    pub proposer: ValidatorId,
    /// Proposer's wall-clock time in milliseconds.
    pub timestamp: u64,
    /// Merkle root over the per-shard parent state roots.
    pub shard_root: Hash,
    /// Ordered transactions: shard ascending, submission order within a shard.
    pub transactions: Vec<Transaction>,
    /// Block hash.
    pub hash: Hash,
}

impl Block {
    /// Assemble a block and compute its hash.
    pub fn new(
        height: u64,
        previous_hash: Hash,
        round: u32,
        proposer: ValidatorId,
        timestamp: u64,
        shard_root: Hash,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Self {
            height,
            previous_hash,
            round,
            proposer,
            timestamp,
            shard_root,
            transactions,
            hash: ZERO_HASH,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Genesis block. No proposer, no transactions.
    pub fn genesis(timestamp: u64) -> Self {
        Self::new(0, ZERO_HASH, 0, [0u8; 32], timestamp, ZERO_HASH, Vec::new())
    }

    /// Recompute the hash from the block contents.
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.round.to_le_bytes());
        hasher.update(self.proposer);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.shard_root);
        hasher.update((self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash());
        }
        hasher.finalize().into()
    }

    /// Whether the stored hash matches the contents.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.previous_hash == ZERO_HASH
    }
}

// =============================================================================
// CLUSTER B: CONSENSUS
// =============================================================================

/// Vote kind within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteKind {
    /// First voting phase.
    Prevote,
    /// Second voting phase; a quorum commits.
    Precommit,
}

/// Phase of a consensus round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    /// Waiting for the round's proposer.
    #[default]
    Propose,
    /// Collecting prevotes.
    Prevote,
    /// Collecting precommits.
    Precommit,
    /// Block committed; terminal for the height.
    Commit,
}

impl Phase {
    /// The vote kind collected in this phase, if any.
    pub fn vote_kind(&self) -> Option<VoteKind> {
        match self {
            Phase::Prevote => Some(VoteKind::Prevote),
            Phase::Precommit => Some(VoteKind::Precommit),
            Phase::Propose | Phase::Commit => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Propose => "propose",
            Phase::Prevote => "prevote",
            Phase::Precommit => "precommit",
            Phase::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// A signed vote for a block hash.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Voting validator.
    pub voter: ValidatorId,
    /// Height voted on.
    pub height: u64,
    /// Round within the height.
    pub round: u32,
    /// Prevote or precommit.
    pub kind: VoteKind,
    /// Block hash voted for.
    pub block_hash: Hash,
    /// Ed25519 signature over [`Vote::signing_bytes`].
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Vote {
    /// Create and sign a vote.
    pub fn signed(
        keypair: &ValidatorKeyPair,
        height: u64,
        round: u32,
        kind: VoteKind,
        block_hash: Hash,
    ) -> Self {
        let voter = keypair.public_key();
        let signature = keypair.sign(&vote_signing_bytes(height, round, kind, &block_hash));
        Self {
            voter,
            height,
            round,
            kind,
            block_hash,
            signature,
        }
    }

    /// Bytes covered by the voter's signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        vote_signing_bytes(self.height, self.round, self.kind, &self.block_hash)
    }

    /// Verify the signature against the voter's key.
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.voter, &self.signing_bytes(), &self.signature)
    }

    /// Whether `other` is a conflicting vote from the same voter in the same phase.
    pub fn conflicts_with(&self, other: &Vote) -> bool {
        self.voter == other.voter
            && self.height == other.height
            && self.round == other.round
            && self.kind == other.kind
            && self.block_hash != other.block_hash
    }
}

fn vote_signing_bytes(height: u64, round: u32, kind: VoteKind, block_hash: &Hash) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(7 + 8 + 4 + 1 + 32);
    bytes.extend_from_slice(b"ql-vote");
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes.extend_from_slice(&round.to_le_bytes());
    bytes.push(match kind {
        VoteKind::Prevote => 1,
        VoteKind::Precommit => 2,
    });
    bytes.extend_from_slice(block_hash);
    bytes
}

/// Precommits that finalized a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitCertificate {
    /// Committed block hash.
    pub block_hash: Hash,
    /// Height of the block.
    pub height: u64,
    /// Round whose precommits formed the quorum.
    pub round: u32,
    /// The counted precommits.
    pub precommits: Vec<Vote>,
    /// Total voting power of `precommits`.
    pub voting_power: u64,
}

// =============================================================================
// CLUSTER C: STATE
// =============================================================================

/// Balance and nonce of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account balance in base units.
    pub balance: u64,
    /// Number of transactions sent.
    pub nonce: u64,
}

/// Tip of the committed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Height of the last committed block.
    pub height: u64,
    /// Hash of the last committed block.
    pub hash: Hash,
}

/// Verifiable point-in-time copy of ledger state.
///
/// `accounts` stays the last field: the bincode encoding then ends with
/// account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Height of the block the state belongs to.
    pub height: u64,
    /// Hash of the block committed at `height`.
    pub block_hash: Hash,
    /// Claimed state root over `accounts`.
    pub state_root: Hash,
    /// Full account set.
    pub accounts: AccountSet,
}

impl StateSnapshot {
    /// Build a snapshot, computing the root from `accounts`.
    pub fn new(height: u64, block_hash: Hash, accounts: AccountSet) -> Self {
        let state_root = compute_state_root(&accounts);
        Self {
            height,
            block_hash,
            state_root,
            accounts,
        }
    }

    /// Recompute the root and compare it with the claimed one.
    pub fn verify_root(&self) -> bool {
        compute_state_root(&self.accounts) == self.state_root
    }

    /// Header part of the snapshot.
    pub fn head(&self) -> ChainHead {
        ChainHead {
            height: self.height,
            hash: self.block_hash,
        }
    }
}
