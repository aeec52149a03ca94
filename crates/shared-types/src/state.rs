//! # Account State
//!
//! Account balances and nonces, transaction application and the state root.

use crate::entities::{AccountState, Address, Hash, Transaction};
use crate::errors::TransitionError;
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// All accounts, ordered by address.
pub type AccountSet = BTreeMap<Address, AccountState>;

/// Keccak-256 over `(address, balance LE, nonce LE)` in address order.
pub fn compute_state_root(accounts: &AccountSet) -> Hash {
    let mut hasher = Keccak256::new();
    for (address, account) in accounts {
        hasher.update(address);
        hasher.update(account.balance.to_le_bytes());
        hasher.update(account.nonce.to_le_bytes());
    }
    hasher.finalize().into()
}

/// Check a transaction against `accounts` without applying it.
pub fn validate_transaction(accounts: &AccountSet, tx: &Transaction) -> Result<(), TransitionError> {
    if tx.amount == 0 {
        return Err(TransitionError::ZeroAmount);
    }
    if !tx.verify() {
        return Err(TransitionError::InvalidSignature);
    }
    let sender = accounts.get(&tx.sender).copied().unwrap_or_default();
    if sender.nonce.checked_add(1) != Some(tx.nonce) {
        return Err(TransitionError::InvalidNonce {
            expected: sender.nonce + 1,
            got: tx.nonce,
        });
    }
    if sender.balance < tx.amount {
        return Err(TransitionError::InsufficientBalance {
            balance: sender.balance,
            amount: tx.amount,
        });
    }
    Ok(())
}

/// Apply one transaction: debit sender, bump its nonce, credit receiver.
pub fn apply_transaction(accounts: &mut AccountSet, tx: &Transaction) -> Result<(), TransitionError> {
    validate_transaction(accounts, tx)?;

    let receiver_balance = accounts.get(&tx.receiver).map(|a| a.balance).unwrap_or(0);
    if tx.receiver != tx.sender && receiver_balance.checked_add(tx.amount).is_none() {
        return Err(TransitionError::BalanceOverflow);
    }

    let sender = accounts.entry(tx.sender).or_default();
    sender.balance -= tx.amount;
    sender.nonce += 1;

    let receiver = accounts.entry(tx.receiver).or_default();
    receiver.balance += tx.amount;
    Ok(())
}

/// Apply a whole block's transactions to a copy of `accounts`.
///
/// Either every transaction applies or the original set is untouched.
pub fn apply_block(accounts: &AccountSet, txs: &[Transaction]) -> Result<AccountSet, TransitionError> {
    let mut next = accounts.clone();
    for tx in txs {
        apply_transaction(&mut next, tx)?;
    }
    Ok(next)
}
