//! # Transaction Buffer Client Test Suite
//!
//! End-to-end flows through the public client API against in-memory brokers.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs      # commit/abort over partitioned topics, lookup failures
//!     └── lifecycle.rs  # timeouts, stale replies, close
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p txn-buffer-tests
//! cargo test -p txn-buffer-tests integration::lifecycle::
//! ```

#![allow(dead_code)]
