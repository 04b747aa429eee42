//! Port traits of the remote node subsystem.

pub mod outbound;
