//! # Shard Routing in Committed Blocks
//!
//! Transactions from many senders are validated per shard and merged in
//! ascending shard order; balances move without creating or losing supply.

#[cfg(test)]
mod tests {
    use crate::integration::support::{devnet, transfer, wait_until};
    use ql_05_shard_router::assign_shard;
    use shared_types::LedgerStore;

    #[tokio::test(start_paused = true)]
    async fn test_committed_blocks_are_shard_ordered_and_conserve_supply() {
        let devnet = devnet();
        let shard_count = devnet.config().shard.shard_count;
        let accounts = devnet.genesis().accounts.len();

        for from in 0..accounts {
            let tx = transfer(&devnet, from, (from + 1) % accounts, 15, 1);
            assert_eq!(devnet.submit(&tx), 4);
        }

        let node = devnet.node(0).unwrap();
        wait_until("every transfer committed", || {
            let view = node.ledger().view();
            devnet
                .genesis()
                .accounts
                .iter()
                .all(|key| view.account(&key.address()).nonce == 1)
        })
        .await;

        let mut committed = 0;
        for height in 1..=node.committed_height() {
            let block = node.ledger().block_at(height).unwrap();
            let shards: Vec<_> = block
                .transactions
                .iter()
                .map(|tx| assign_shard(&tx.sender, shard_count))
                .collect();
            assert!(
                shards.windows(2).all(|w| w[0] <= w[1]),
                "block {height} is not in shard order: {shards:?}"
            );
            committed += block.transactions.len();
        }
        assert_eq!(committed, accounts);

        let view = node.ledger().view();
        let supply: u64 = view.accounts.values().map(|a| a.balance).sum();
        assert_eq!(supply, devnet.genesis().total_supply());
        devnet.shutdown().await;
    }
}
