//! # Validator Agreement
//!
//! Validators over the in-process network commit transactions, execute
//! them, and end up with identical chains and application state.

#[cfg(test)]
mod tests {
    use super::super::support::{
        assert_same_chain, devnet, eventually, height, start_and_link, transfer,
    };
    use cc_03_consensus::TransactionPool;

    // =========================================================================
    // COMMIT AND EXECUTE
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_four_validators_commit_and_agree_on_state() {
        let devnet = devnet(4);
        start_and_link(&devnet, &[0, 1, 2, 3]).await;

        let accepted = devnet.nodes[0]
            .core
            .send_transaction(transfer("alice", 0, "greeting", "hello"))
            .await
            .expect("transaction accepted");
        assert!(accepted);

        eventually("greeting executed everywhere", || async {
            devnet
                .nodes
                .iter()
                .all(|node| node.dapp.get("greeting").as_deref() == Some("hello"))
        })
        .await;

        // the transaction block plus the block proving its state
        eventually("proof block committed everywhere", || async {
            devnet.min_height().await.unwrap_or(0) >= 3
        })
        .await;
        assert_same_chain(&devnet, &[0, 1, 2, 3], 3).await;

        let expected = devnet.nodes[0].dapp.app_state().hash;
        for node in &devnet.nodes {
            assert_eq!(node.dapp.app_state().hash, expected);
        }

        devnet.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_transactions_gossip_to_every_pool() {
        let devnet = devnet(4);
        start_and_link(&devnet, &[0, 1, 2, 3]).await;

        for i in 0..3 {
            devnet.nodes[2]
                .core
                .send_transaction(transfer(&format!("bob-{}", i), 0, &format!("gossip-{}", i), "seen"))
                .await
                .expect("transaction accepted");
        }

        eventually("every transaction applied on every node", || async {
            devnet.nodes.iter().all(|node| {
                (0..3).all(|i| node.dapp.get(&format!("gossip-{}", i)).is_some())
            })
        })
        .await;
        for node in &devnet.nodes {
            assert_eq!(node.dapp.next_nonce("bob-0"), 1);
        }

        devnet.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_transaction_is_not_accepted_twice() {
        // not started, so nothing drains the pool between submissions
        let devnet = devnet(1);
        let core = &devnet.nodes[0].core;
        let tx = transfer("carol", 0, "k", "v");
        assert!(core.send_transaction(tx.clone()).await.expect("first"));
        assert!(!core.send_transaction(tx).await.expect("second"));
        assert_eq!(core.pool().len(), 1);
    }

    // =========================================================================
    // FAULT TOLERANCE
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_progress_with_one_validator_offline() {
        let devnet = devnet(4);
        // validator-3 holds a quarter of the power and never comes up
        start_and_link(&devnet, &[0, 1, 2]).await;

        devnet.nodes[1]
            .core
            .send_transaction(transfer("dave", 0, "quorum", "3 of 4"))
            .await
            .expect("transaction accepted");

        eventually("committed without validator-3", || async {
            devnet.nodes[..3]
                .iter()
                .all(|node| node.dapp.get("quorum").as_deref() == Some("3 of 4"))
        })
        .await;
        assert_same_chain(&devnet, &[0, 1, 2], 2).await;
        assert!(devnet.hub().links_of(&devnet.nodes[3].peer_id).is_empty());

        devnet.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_progress_with_half_the_validators() {
        let devnet = devnet(4);
        start_and_link(&devnet, &[0, 1]).await;

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(height(&devnet.nodes[0]).await, 0);
        assert_eq!(height(&devnet.nodes[1]).await, 0);

        devnet.stop_all().await;
    }
}
