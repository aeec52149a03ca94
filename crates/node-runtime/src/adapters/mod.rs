//! # Adapters
//!
//! Port implementations connecting the subsystems to the runtime.

mod clock;
mod mempool;
mod network;
mod snapshot;

pub use clock::TokioTimeSource;
pub use mempool::{InMemoryMempool, MempoolError};
pub use network::{InProcessNetwork, NetworkEndpoint};
pub use snapshot::NetworkSnapshotSource;
