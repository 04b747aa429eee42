//! # Node Runtime Library
//!
//! Wiring of a Concord Chain node, exposed for the binary and for tests.
//!
//! - `wiring/` - `ChainCore`, the assembled node
//! - `handlers/` - handshake and peer message dispatch
//! - `container/` - `NodeConfig` and environment overrides
//! - `genesis/` - genesis block construction
//! - `adapters/` - in-process network, sample application, RocksDB store
//! - `devnet` - several nodes in one process

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod devnet;
pub mod errors;
pub mod genesis;
pub mod handlers;
pub mod wiring;

pub use container::{ConfigError, NodeConfig};
pub use errors::{NodeError, NodeResult};
pub use wiring::{ChainCore, ChainCoreDependencies, CoreEngine};
