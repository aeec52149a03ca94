//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Loaded from an optional TOML file named by `QL_CONFIG`, then overridden
//! by `QL_*` environment variables, then validated.
//!
//! ```toml
//! [round]
//! propose_timeout_ms = 2000
//!
//! [shard]
//! shard_count = 8
//!
//! [devnet]
//! validators = 7
//! ```

use ql_01_peer_registry::RegistryConfig;
use ql_03_round_manager::RoundConfig;
use ql_04_state_sync::SyncConfig;
use ql_05_shard_router::ShardConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "QL_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Peer registry configuration.
    pub registry: RegistryConfig,
    /// Round manager configuration.
    pub round: RoundConfig,
    /// State sync configuration.
    pub sync: SyncConfig,
    /// Shard router configuration.
    pub shard: ShardConfig,
    /// Transport configuration.
    pub network: NetworkConfig,
    /// Mempool configuration.
    pub mempool: MempoolConfig,
    /// Actor and task timing.
    pub runtime: RuntimeConfig,
    /// Local devnet layout.
    pub devnet: DevnetConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// In-process transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-node inbound queue length. Messages to a full queue are dropped.
    pub queue_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4096,
        }
    }
}

/// Mempool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum transactions in pool.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Consensus actor timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deadline check interval.
    pub tick_interval_ms: u64,
    /// Heartbeat broadcast interval.
    pub heartbeat_interval_ms: u64,
    /// Consensus actor inbox length.
    pub inbox_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            heartbeat_interval_ms: 1_000,
            inbox_capacity: 4096,
        }
    }
}

impl RuntimeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Local devnet layout used by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    /// Validators started in this process.
    pub validators: u8,
    /// Voting power of each validator.
    pub voting_power: u64,
    /// Funded user accounts in the genesis allocation.
    pub accounts: u8,
    /// Genesis balance of each funded account.
    pub initial_balance: u64,
    /// Interval between generated transfers; 0 disables the load generator.
    pub tx_interval_ms: u64,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            validators: 4,
            voting_power: 1,
            accounts: 8,
            initial_balance: 1_000_000,
            tx_interval_ms: 100,
        }
    }
}

impl NodeConfig {
    /// Create a config for testing (short timeouts, small devnet).
    pub fn for_testing() -> Self {
        Self {
            registry: RegistryConfig::for_testing(),
            round: RoundConfig::for_testing(),
            sync: SyncConfig::for_testing(),
            shard: ShardConfig::for_testing(),
            network: NetworkConfig {
                queue_capacity: 1024,
            },
            mempool: MempoolConfig::default(),
            runtime: RuntimeConfig {
                tick_interval_ms: 10,
                heartbeat_interval_ms: 100,
                inbox_capacity: 1024,
            },
            devnet: DevnetConfig {
                validators: 4,
                voting_power: 1,
                accounts: 4,
                initial_balance: 1_000,
                tx_interval_ms: 0,
            },
        }
    }

    /// Load from `QL_CONFIG` (if set) and apply `QL_*` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `QL_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "QL_VALIDATORS", &mut self.devnet.validators)?;
        override_from(&lookup, "QL_TX_INTERVAL_MS", &mut self.devnet.tx_interval_ms)?;
        override_from(&lookup, "QL_SHARD_COUNT", &mut self.shard.shard_count)?;
        override_from(&lookup, "QL_PROPOSE_TIMEOUT_MS", &mut self.round.propose_timeout_ms)?;
        override_from(&lookup, "QL_MAX_BLOCK_TXS", &mut self.round.max_block_txs)?;
        override_from(&lookup, "QL_TICK_INTERVAL_MS", &mut self.runtime.tick_interval_ms)?;
        override_from(&lookup, "QL_SYNC_MAX_ATTEMPTS", &mut self.sync.max_attempts)?;
        Ok(())
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.shard.shard_count == 0, "shard.shard_count must be positive"),
            (self.round.max_block_txs == 0, "round.max_block_txs must be positive"),
            (self.round.propose_timeout_ms == 0, "round.propose_timeout_ms must be positive"),
            (self.sync.max_attempts == 0, "sync.max_attempts must be positive"),
            (self.runtime.tick_interval_ms == 0, "runtime.tick_interval_ms must be positive"),
            (self.runtime.heartbeat_interval_ms == 0, "runtime.heartbeat_interval_ms must be positive"),
            (self.runtime.inbox_capacity == 0, "runtime.inbox_capacity must be positive"),
            (self.network.queue_capacity == 0, "network.queue_capacity must be positive"),
            (self.devnet.validators == 0, "devnet.validators must be positive"),
            (
                self.devnet.voting_power < self.registry.min_voting_power,
                "devnet.voting_power is below registry.min_voting_power",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(ConfigError::Invalid((*reason).to_string())),
            None => Ok(()),
        }
    }
}

fn override_from<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        *target = value
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value })?;
    }
    Ok(())
}
