//! # Peer Handlers
//!
//! Inbound side of `ChainCore`: handshake, message dispatch and request
//! serving.

pub mod peer_messages;
