//! Multi-node integration tests.

pub mod support;

mod catch_up;
mod consensus;
