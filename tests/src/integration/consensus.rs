//! # Consensus Flow
//!
//! Propose, prevote, precommit and commit across four validators.

#[cfg(test)]
mod tests {
    use crate::integration::support::{assert_same_block, devnet, transfer, wait_for_height};
    use shared_types::{LedgerStore, Participation};

    const ALL: [usize; 4] = [0, 1, 2, 3];

    #[tokio::test(start_paused = true)]
    async fn test_four_validators_commit_consecutive_heights() {
        let devnet = devnet();

        for nonce in 1..=3 {
            let tx = transfer(&devnet, 0, 1, 10, nonce);
            assert_eq!(devnet.submit(&tx), 4);
            wait_for_height(&devnet, &ALL, nonce).await;
        }

        for height in 1..=3 {
            assert_same_block(&devnet, &ALL, height);
        }
        let receiver = devnet.genesis().accounts[1].address();
        for node in devnet.nodes() {
            let view = node.ledger().view();
            assert_eq!(view.account(&receiver).balance, 1_030);
            assert_eq!(node.status().participation, Participation::Voting);
        }
        // Committed transactions left every mempool.
        assert!(devnet.nodes().iter().all(|n| n.mempool().is_empty()));
        devnet.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commits_with_one_validator_offline() {
        let devnet = devnet();
        devnet.disconnect(3);

        let tx = transfer(&devnet, 2, 0, 5, 1);
        assert_eq!(devnet.submit(&tx), 3);
        wait_for_height(&devnet, &[0, 1, 2], 1).await;

        assert_same_block(&devnet, &[0, 1, 2], 1);
        assert_eq!(devnet.node(3).unwrap().committed_height(), 0);
        devnet.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_mempool_produces_no_blocks() {
        let devnet = devnet();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;

        assert_eq!(devnet.committed_heights(), vec![0, 0, 0, 0]);
        // Rounds kept rotating on propose timeouts.
        assert!(devnet.node(0).unwrap().status().round > 0);
        devnet.shutdown().await;
    }
}
