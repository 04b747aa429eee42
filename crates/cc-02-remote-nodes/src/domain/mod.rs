//! Peer bookkeeping domain.

pub mod errors;
pub mod peer;
pub mod remote_node;
pub mod remote_node_set;
pub mod sampling;
