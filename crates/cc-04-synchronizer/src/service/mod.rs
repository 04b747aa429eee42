//! Synchronizer services.

mod responder;
mod synchronizer;

#[cfg(test)]
mod tests;

pub use responder::Responder;
pub use synchronizer::Synchronizer;
