//! Gossip fan-out sizing and sampling.

use rand::seq::SliceRandom;
use std::sync::Arc;

/// Number of receivers for `count` candidates: `floor(count ^ exponent)`.
pub fn fan_out(count: usize, exponent: f64) -> usize {
    if count == 0 {
        return 0;
    }
    let size = (count as f64).powf(exponent).floor();
    if size.is_nan() || size < 0.0 {
        return 0;
    }
    (size as usize).min(count)
}

/// Uniform sample without replacement.
pub fn sample<T>(candidates: &[Arc<T>], size: usize) -> Vec<Arc<T>> {
    candidates
        .choose_multiple(&mut rand::thread_rng(), size)
        .cloned()
        .collect()
}
