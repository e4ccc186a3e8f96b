//! # Event-Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── routing_benchmarks.rs  # selector, codec and resolve throughput
//! └── src/integration/
//!     ├── scenarios.rs           # register / resolve flows over in-memory backends
//!     ├── concurrency.rs         # racing registrations, multi-threaded fairness
//!     └── http_roundtrip.rs      # the same flows through the axum router
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p eg-tests
//! cargo test -p eg-tests integration::concurrency
//! cargo bench -p eg-tests
//! ```

pub mod integration;
