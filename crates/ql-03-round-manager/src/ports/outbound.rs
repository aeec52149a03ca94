//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_types::{Hash, NetworkMessage, Timestamp, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Outbound message sink for the consensus actor.
///
/// Must not block: implementations hand the message to the transport and
/// return immediately.
pub trait ConsensusBroadcaster: Send + Sync {
    /// Send to every peer.
    fn broadcast(&self, message: NetworkMessage);
}

/// Mempool interface for block building.
#[async_trait]
pub trait MempoolGateway: Send + Sync {
    /// Up to `max` pending transactions in submission order.
    async fn pull_batch(&self, max: usize) -> Vec<Transaction>;

    /// Drop transactions that were included in a committed block.
    async fn remove_committed(&self, tx_hashes: &[Hash]);
}

/// Monotonic clock in milliseconds.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin.
    fn now(&self) -> Timestamp;
}

/// Monotonic system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Virtual clock moved by hand. Used to test round advancement.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
