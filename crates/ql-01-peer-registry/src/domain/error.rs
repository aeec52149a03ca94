//! Error types for the Peer Registry

use shared_types::{short_id, ValidatorId};
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Voting power below the configured minimum.
    #[error("Voting power {power} below minimum {min}")]
    InsufficientVotingPower { power: u64, min: u64 },

    /// Validator already registered.
    #[error("Validator {} already registered", short_id(.0))]
    AlreadyRegistered(ValidatorId),

    /// Validator not known to the registry.
    #[error("Unknown validator {}", short_id(.0))]
    UnknownValidator(ValidatorId),

    /// Validator was retired and cannot be changed.
    #[error("Validator {} is retired", short_id(.0))]
    Retired(ValidatorId),
}
