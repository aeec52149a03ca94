//! # Fault Evidence
//!
//! Protocol violations attributed to a validator. Faults never stop the
//! state machine; they are recorded here for audit and future slashing.

use shared_types::{Hash, Timestamp, Vote, VoteKind};

/// Evidence of a protocol violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultEvidence {
    /// Two votes for different hashes in the same phase.
    Equivocation {
        height: u64,
        round: u32,
        kind: VoteKind,
        first: Hash,
        second: Hash,
    },
    /// A vote or proposal whose signature did not verify.
    InvalidSignature { height: u64, round: u32 },
    /// A proposal that failed validation.
    MalformedProposal {
        height: u64,
        round: u32,
        reason: String,
    },
    /// An announced height its snapshot could not back up.
    UnverifiableSnapshot { height: u64, reason: String },
}

impl FaultEvidence {
    /// Evidence from two conflicting votes.
    pub fn equivocation(first: &Vote, second: &Vote) -> Self {
        Self::Equivocation {
            height: first.height,
            round: first.round,
            kind: first.kind,
            first: first.block_hash,
            second: second.block_hash,
        }
    }

    /// Height of the violation.
    pub fn height(&self) -> u64 {
        match self {
            Self::Equivocation { height, .. }
            | Self::InvalidSignature { height, .. }
            | Self::MalformedProposal { height, .. }
            | Self::UnverifiableSnapshot { height, .. } => *height,
        }
    }
}

/// A fault as stored in the registry's append-only log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultRecord {
    /// What happened.
    pub evidence: FaultEvidence,
    /// When it was recorded (local clock).
    pub recorded_at: Timestamp,
}
