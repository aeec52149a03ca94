//! Domain layer for the Round Manager

mod error;
mod round;

pub use error::*;
pub use round::*;
