//! Key layout of ledger records.

use shared_types::Hash;

/// Key prefixes for each record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Header by height: `h:{height}` -> BlockHeader
    Header,
    /// Body by height: `b:{height}` -> BlockBody
    Body,
    /// Validator set by root: `vs:{root}` -> ValidatorSet
    ValidatorSet,
    /// Singletons: `m:height`, `m:last-consensus`
    Meta,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Header => b"h:",
            KeyPrefix::Body => b"b:",
            KeyPrefix::ValidatorSet => b"vs:",
            KeyPrefix::Meta => b"m:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn header_key(height: u64) -> Vec<u8> {
        KeyPrefix::Header.key(&height.to_be_bytes())
    }

    pub fn body_key(height: u64) -> Vec<u8> {
        KeyPrefix::Body.key(&height.to_be_bytes())
    }

    pub fn validator_set_key(root: &Hash) -> Vec<u8> {
        KeyPrefix::ValidatorSet.key(root.as_bytes())
    }

    /// Tip pointer.
    pub fn height_key() -> Vec<u8> {
        KeyPrefix::Meta.key(b"height")
    }

    /// Precommit quorum of the tip.
    pub fn last_consensus_key() -> Vec<u8> {
        KeyPrefix::Meta.key(b"last-consensus")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_do_not_collide() {
        assert_ne!(KeyPrefix::header_key(1), KeyPrefix::body_key(1));
        assert_ne!(KeyPrefix::height_key(), KeyPrefix::last_consensus_key());
        assert!(KeyPrefix::validator_set_key(&Hash::ZERO).starts_with(b"vs:"));
    }

    #[test]
    fn test_height_keys_sort_by_height() {
        assert!(KeyPrefix::header_key(2) < KeyPrefix::header_key(256));
    }
}
