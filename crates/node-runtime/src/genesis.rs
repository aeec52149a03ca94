//! # Genesis
//!
//! Deterministic devnet genesis: validator keys, funded user accounts and the
//! initial account allocation. Every node of a devnet builds the same
//! genesis from the same [`DevnetConfig`].

use crate::config::DevnetConfig;
use shared_types::{AccountSet, AccountState, ValidatorId, ValidatorKeyPair};

/// Seed offset separating user keys from validator keys.
const ACCOUNT_SEED_BASE: u8 = 0x80;

/// Devnet genesis.
#[derive(Debug, Clone)]
pub struct DevnetGenesis {
    /// Validator signing keys, in startup order.
    pub validators: Vec<ValidatorKeyPair>,
    /// Keys of the funded user accounts.
    pub accounts: Vec<ValidatorKeyPair>,
    /// Genesis account allocation.
    pub allocation: AccountSet,
    /// Voting power of every validator.
    pub voting_power: u64,
}

impl DevnetGenesis {
    pub fn build(config: &DevnetConfig) -> Self {
        let validators = (0..config.validators)
            .map(|i| ValidatorKeyPair::from_seed([i.wrapping_add(1); 32]))
            .collect();
        let accounts: Vec<_> = (0..config.accounts)
            .map(|i| ValidatorKeyPair::from_seed([ACCOUNT_SEED_BASE.wrapping_add(i); 32]))
            .collect();
        let allocation = accounts
            .iter()
            .map(|key| {
                (
                    key.address(),
                    AccountState {
                        balance: config.initial_balance,
                        nonce: 0,
                    },
                )
            })
            .collect();
        Self {
            validators,
            accounts,
            allocation,
            voting_power: config.voting_power,
        }
    }

    /// `(id, voting power)` for every validator.
    pub fn validator_set(&self) -> Vec<(ValidatorId, u64)> {
        self.validators
            .iter()
            .map(|key| (key.public_key(), self.voting_power))
            .collect()
    }

    /// Sum of all genesis balances.
    pub fn total_supply(&self) -> u64 {
        self.allocation.values().map(|a| a.balance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        let config = DevnetConfig::default();
        let a = DevnetGenesis::build(&config);
        let b = DevnetGenesis::build(&config);
        assert_eq!(a.validator_set(), b.validator_set());
        assert_eq!(a.allocation, b.allocation);
        assert_eq!(a.validators.len(), 4);
        assert_eq!(a.total_supply(), 8 * 1_000_000);
    }

    #[test]
    fn test_validators_and_accounts_do_not_collide() {
        let genesis = DevnetGenesis::build(&DevnetConfig::default());
        for validator in &genesis.validators {
            assert!(!genesis.allocation.contains_key(&validator.address()));
        }
    }
}
