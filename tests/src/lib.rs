//! # Counterfactual Monitor Test Suite
//!
//! Cross-crate flows: submitter → store → supervisor → checker → bus →
//! reconciler → store, with scripted node / relay / indexer doubles.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── e2e_flows.rs    # Self-paid and sponsored lifecycles end to end
//!     ├── lifecycle.rs    # Monotonic status, retries, de-duplication
//!     └── persistence.rs  # Resuming in-flight entries from the file store
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cf-tests
//! cargo test -p cf-tests integration::e2e_flows
//! ```

pub mod integration;
