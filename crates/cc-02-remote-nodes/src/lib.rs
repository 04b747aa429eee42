//! # Remote Nodes (cc-02)
//!
//! Bookkeeping for connected peers and the selection policies that drive
//! sync-source choice and gossip fan-out.
//!
//! ## Selection Policies
//!
//! | Policy | Peers considered | Size |
//! |--------|------------------|------|
//! | `best_node` | all | 1, highest reported height, first wins ties |
//! | `pick_provider(h)` | height >= h | 1, uniform |
//! | `pick_idle_provider(h)` | height >= h, not serving a request | 1, uniform |
//! | `pick_transaction_receivers(e)` | all | `floor(n^e)` |
//! | `pick_block_receivers(h, e)` | height < h | `floor(n^e)` |
//! | `pick_consensus_receivers(h)` | height == h - 1 | all of them |
//!
//! ## Crate Structure
//!
//! - `domain/` - `PeerId`, `RemoteNode`, `RemoteNodeSet`, fan-out sampling
//! - `ports/` - `PeerNetwork` transport port
//! - `testing` - `RecordingNetwork` test double

pub mod domain;
pub mod ports;
pub mod testing;

pub use domain::errors::PeerError;
pub use domain::peer::PeerId;
pub use domain::remote_node::RemoteNode;
pub use domain::remote_node_set::RemoteNodeSet;
pub use domain::sampling::fan_out;
pub use ports::outbound::PeerNetwork;
