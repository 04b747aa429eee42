//! Ports of the Consensus subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::ReachedBlockSink;
pub use outbound::{Dapp, SystemTimeSource, TimeSource, TransactionPool};
