//! Synchronizer domain: errors and header batch checks.

pub mod errors;
pub mod header_batch;

pub use errors::{SyncError, SyncResult};
pub use header_batch::validate_header_batch;
