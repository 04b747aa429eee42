//! # Concord Chain Test Suite
//!
//! Cross-crate tests that run whole nodes.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # devnet setup and polling helpers
//!     ├── consensus.rs   # validators agreeing over the in-process network
//!     └── catch_up.rs    # nodes joining late and syncing
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cc-tests
//! RUST_LOG=debug cargo test -p cc-tests integration::catch_up -- --nocapture
//! ```

pub mod integration;
