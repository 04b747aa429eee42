//! # CC-04 Synchronizer
//!
//! Catch-up for nodes behind the network.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (domain + service over cc-02/cc-03 ports)
//!
//! ## Purpose
//!
//! When a peer reports a height above the local tip, fetch the missing
//! headers and bodies from an idle provider and hand each block, with the
//! quorum that committed it, to the consensus engine's
//! `add_reached_block`. Synced blocks therefore go through exactly the
//! checks live blocks do.
//!
//! ## Fetch Round
//!
//! ```text
//! GetHeaders(tip+1, n) ──► linkage check ──► GetBodies(tip+1, n)
//!        ──► GetConsentedHeader(last) ──► add_reached_block × n
//! ```
//!
//! The consensus of block `i` travels in the body of block `i + 1`; the
//! last block's comes from `GetConsentedHeader`.
//!
//! ## Peer Faults
//!
//! | Fault | Handling |
//! |-------|----------|
//! | Transport error, timeout | Drop peer |
//! | Wrong response variant or length | Drop peer |
//! | Broken header chain | Drop peer |
//! | Block rejected by consensus | Drop peer |
//!
//! ## Module Structure
//!
//! ```text
//! cc-04-synchronizer/
//! ├── domain/          # SyncError, header batch validation
//! ├── service/         # Synchronizer (client side), Responder (server side)
//! └── config.rs        # SynchronizerConfig
//! ```

pub mod config;
pub mod domain;
pub mod service;

pub use config::SynchronizerConfig;
pub use domain::{validate_header_batch, SyncError, SyncResult};
pub use service::{Responder, Synchronizer};
