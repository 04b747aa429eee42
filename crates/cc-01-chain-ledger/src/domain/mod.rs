//! Ledger domain: errors and key layout.

pub mod errors;
pub mod keys;
