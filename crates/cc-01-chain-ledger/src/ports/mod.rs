//! Port traits of the ledger.

pub mod outbound;
