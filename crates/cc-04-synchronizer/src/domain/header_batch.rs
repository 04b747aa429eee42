//! # Header Batch
//!
//! Checks on a batch of headers before any body is requested.

use super::errors::{SyncError, SyncResult};
use shared_types::{BlockHeader, Hashable};

/// Validate that `headers` start at `from` and form a chain.
///
/// # Checks
/// 1. First height is `from`
/// 2. Height increment
/// 3. Parent hash continuity
/// 4. Timestamps never go back
pub fn validate_header_batch(from: u64, headers: &[BlockHeader]) -> SyncResult<()> {
    let Some(first) = headers.first() else {
        return Ok(());
    };
    if first.height != from {
        return Err(SyncError::InvalidHeaderChain(format!(
            "batch starts at #{}, requested #{}",
            first.height, from
        )));
    }

    for window in headers.windows(2) {
        let prev = &window[0];
        let curr = &window[1];

        if curr.height != prev.height + 1 {
            return Err(SyncError::InvalidHeaderChain(format!(
                "height gap at #{}: expected #{}",
                curr.height,
                prev.height + 1
            )));
        }

        if curr.last_block_hash != prev.hash() {
            return Err(SyncError::InvalidHeaderChain(format!(
                "broken chain at #{}: parent is not {}",
                curr.height,
                prev.hash()
            )));
        }

        if curr.timestamp < prev.timestamp {
            return Err(SyncError::InvalidHeaderChain(format!(
                "timestamp goes back at #{}",
                curr.height
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Hash;

    fn create_valid_chain(from: u64, count: usize) -> Vec<BlockHeader> {
        let mut headers: Vec<BlockHeader> = Vec::with_capacity(count);
        for i in 0..count {
            let last_block_hash = headers
                .last()
                .map(|prev| prev.hash())
                .unwrap_or_else(|| Hash::from_data("parent"));
            headers.push(BlockHeader {
                height: from + i as u64,
                timestamp: 1000 + i as u64,
                last_block_hash,
                transactions_root: Hash::ZERO,
                last_consensus_hash: Hash::ZERO,
                next_validator_set_root: Hash::ZERO,
                app_state_hash: Hash::ZERO,
            });
        }
        headers
    }

    #[test]
    fn test_validate_header_batch_empty() {
        assert!(validate_header_batch(5, &[]).is_ok());
    }

    #[test]
    fn test_validate_header_batch_valid() {
        assert!(validate_header_batch(5, &create_valid_chain(5, 4)).is_ok());
    }

    #[test]
    fn test_validate_header_batch_wrong_start() {
        assert!(matches!(
            validate_header_batch(4, &create_valid_chain(5, 2)),
            Err(SyncError::InvalidHeaderChain(_))
        ));
    }

    #[test]
    fn test_validate_header_batch_broken_link() {
        let mut headers = create_valid_chain(5, 3);
        headers[2].last_block_hash = Hash::from_data("elsewhere");
        assert!(validate_header_batch(5, &headers).is_err());
    }

    #[test]
    fn test_validate_header_batch_gap() {
        let mut headers = create_valid_chain(5, 3);
        headers.remove(1);
        assert!(validate_header_batch(5, &headers).is_err());
    }
}
