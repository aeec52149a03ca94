//! Error types for Vote Aggregation

use shared_types::{short_id, ValidatorId};
use thiserror::Error;

/// Aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Voter is not in the voting set for this height.
    #[error("Voter {} is not in the voting set", short_id(.0))]
    UnknownVoter(ValidatorId),

    /// Vote is for a height other than the one being aggregated.
    #[error("Vote for height {got}, aggregating height {expected}")]
    WrongHeight { expected: u64, got: u64 },
}
