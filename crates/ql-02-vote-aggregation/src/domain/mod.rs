//! Domain layer for Vote Aggregation

mod error;
mod tally;

pub use error::*;
pub use tally::*;
