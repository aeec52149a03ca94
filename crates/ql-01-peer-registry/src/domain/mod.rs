//! Domain layer for the Peer Registry

mod error;
mod fault;
mod peer;
mod voting_set;

pub use error::*;
pub use fault::*;
pub use peer::*;
pub use voting_set::*;
