//! Domain layer for State Sync

mod entities;
mod errors;

pub use entities::*;
pub use errors::*;
