//! # Catching Up
//!
//! A node that joins after the validators have moved on fetches the
//! missing blocks from its peers and replays them through its own
//! application.

#[cfg(test)]
mod tests {
    use super::super::support::{
        assert_same_chain, devnet, eventually, height, start_and_link, transfer,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    async fn commit_history(devnet: &node_runtime::devnet::Devnet, validators: &[usize]) -> u64 {
        for i in 0..4 {
            devnet.nodes[0]
                .core
                .send_transaction(transfer(&format!("erin-{}", i), 0, &format!("k{}", i), "v"))
                .await
                .expect("transaction accepted");
        }
        eventually("history executed", || async {
            validators
                .iter()
                .all(|&i| (0..4).all(|k| devnet.nodes[i].dapp.get(&format!("k{}", k)).is_some()))
        })
        .await;
        height(&devnet.nodes[0]).await
    }

    // =========================================================================
    // LATE JOINERS
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_observer_joining_late_catches_up() {
        let mut devnet = devnet(4);
        start_and_link(&devnet, &[0, 1, 2, 3]).await;
        let reached = commit_history(&devnet, &[0, 1, 2, 3]).await;
        assert!(reached >= 2);

        let observer = devnet.spawn_node("observer", None).expect("observer").peer_id.clone();
        let index = devnet.nodes.len() - 1;
        devnet.nodes[index].core.start().await.expect("observer start");
        for i in 0..4 {
            let peer = devnet.nodes[i].peer_id.clone();
            devnet.hub().connect(&observer, &peer).expect("link observer");
        }

        let observer_node = &devnet.nodes[index];
        eventually("observer synced and executed", || async {
            height(observer_node).await >= reached
                && (0..4).all(|k| observer_node.dapp.get(&format!("k{}", k)).is_some())
        })
        .await;
        assert_same_chain(&devnet, &[0, index], reached).await;
        for i in 0..4 {
            assert_eq!(
                devnet.nodes[index].dapp.get(&format!("k{}", i)).as_deref(),
                Some("v")
            );
        }

        devnet.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_validator_rejoining_restores_quorum() {
        let devnet = devnet(4);
        start_and_link(&devnet, &[0, 1, 2]).await;
        let reached = commit_history(&devnet, &[0, 1, 2]).await;

        // validator-3 comes up late, syncs, and then votes with the others
        let late = &devnet.nodes[3];
        late.core.start().await.expect("validator-3 start");
        for i in 0..3 {
            devnet
                .hub()
                .connect(&late.peer_id, &devnet.nodes[i].peer_id)
                .expect("link validator-3");
        }
        eventually("validator-3 synced", || async {
            height(&devnet.nodes[3]).await >= reached
        })
        .await;

        // only three validators remain, so the fourth is needed from here on
        devnet.nodes[2].core.stop().await;
        devnet.hub().isolate(&devnet.nodes[2].peer_id);
        devnet.nodes[3]
            .core
            .send_transaction(transfer("frank", 0, "after", "rejoin"))
            .await
            .expect("transaction accepted");
        eventually("committed with validator-3 voting", || async {
            [0, 1, 3]
                .iter()
                .all(|&i| devnet.nodes[i].dapp.get("after").as_deref() == Some("rejoin"))
        })
        .await;
        assert_same_chain(&devnet, &[0, 1, 3], reached).await;

        devnet.stop_all().await;
    }
}
