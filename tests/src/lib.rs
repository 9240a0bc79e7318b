//! # Ledger-Flow Test Suite
//!
//! Cross-crate scenarios driving the workflow runner against the simulated
//! ledger, asserting on both the returned snapshot and what observers see
//! on the bus.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs   # end-to-end runs: success, failure, retry, guard, barrier, tracking
//!     ├── issuance.rs    # runtime issuance workflow against a block producer
//!     └── observer.rs    # one snapshot per mutation, lifecycle events
//! ```
//!
//! ```bash
//! cargo test -p flow-tests
//! cargo test -p flow-tests integration::observer
//! ```

pub mod integration;
