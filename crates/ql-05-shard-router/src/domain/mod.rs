//! Domain layer for the Shard Router

mod entities;
mod errors;

pub use entities::*;
pub use errors::*;
