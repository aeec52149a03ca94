//! # Quorum-Ledger Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (tally, shard merge)
//! └── src/integration/  # Multi-validator scenarios on an in-process devnet
//!     ├── consensus.rs  # Commit flow, offline validator
//!     ├── faults.rs     # Equivocation, storage failure
//!     ├── sharding.rs   # Shard-ordered blocks, supply conservation
//!     └── sync.rs       # Catch-up and snapshot verification
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ql-tests
//!
//! # By category
//! cargo test -p ql-tests integration::sync::
//!
//! # Benchmarks
//! cargo bench -p ql-tests
//! ```

pub mod integration;
