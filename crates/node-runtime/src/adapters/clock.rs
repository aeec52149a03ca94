//! # Clock Adapter

use ql_03_round_manager::TimeSource;
use shared_types::Timestamp;
use tokio::time::Instant;

/// [`TimeSource`] on the tokio clock, so paused test time also pauses
/// consensus deadlines.
#[derive(Debug, Clone, Copy)]
pub struct TokioTimeSource {
    origin: Instant,
}

impl TokioTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTimeSource {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}
