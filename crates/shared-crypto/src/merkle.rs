//! # Merkle Root
//!
//! Binary keccak tree over an ordered list. The tree is unbalanced: the left
//! subtree always holds the largest power of two strictly below the item
//! count, the right subtree the remainder.

use crate::hashing::{keccak256, Hash, Hashable, KeccakHasher};

/// Largest power of two strictly less than `n` (`n > 1`).
pub fn split_point(n: usize) -> usize {
    let mut i = 1;
    while i < n {
        i <<= 1;
    }
    i >> 1
}

/// Root hash of an ordered list.
///
/// - `[]` hashes the empty byte string
/// - `[x]` is `x.hash()` (a `Hash` leaf passes through unchanged)
/// - otherwise `keccak(root(left) || root(right))` split at [`split_point`]
pub fn merkle_root<T: Hashable>(items: &[T]) -> Hash {
    match items.len() {
        0 => keccak256(&[]),
        1 => items[0].hash(),
        n => {
            let (left, right) = items.split_at(split_point(n));
            let mut hasher = KeccakHasher::new();
            hasher.update(merkle_root(left)).update(merkle_root(right));
            hasher.finalize()
        }
    }
}
