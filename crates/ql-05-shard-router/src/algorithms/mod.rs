//! Shard algorithms

mod assignment;
mod merkle;

pub use assignment::*;
pub use merkle::*;
