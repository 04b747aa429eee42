//! # Adapter Implementations
//!
//! Concrete implementations of the subsystem ports:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (Adapters)                      │
//! │  LocalNetwork, SampleDapp, RocksDbStore                     │
//! │                      ↓ implements ↓                         │
//! │                  MIDDLE LAYER (Ports)                       │
//! │  PeerNetwork (cc-02), Dapp (cc-03), KeyValueStore (cc-01)   │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod local_network;
pub mod sample_dapp;
pub mod storage;

pub use local_network::{LocalHub, LocalNetwork, PeerHandler};
pub use sample_dapp::{SampleDapp, SampleTransaction};
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
