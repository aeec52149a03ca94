//! # State Sync
//!
//! A validator that missed several heights catches up from a peer snapshot,
//! and snapshots whose accounts do not match their root are never applied.

#[cfg(test)]
mod tests {
    use crate::integration::support::{devnet, transfer, wait_for_height, wait_until};
    use node_runtime::adapters::{InProcessNetwork, NetworkSnapshotSource};
    use node_runtime::config::NetworkConfig;
    use ql_04_state_sync::{StateSyncService, SyncConfig, SyncError, SyncOutcome};
    use shared_types::{
        AccountSet, AccountState, InMemoryLedgerStore, LedgerStore, NetworkMessage, PeerTransport,
        StateSnapshot, ValidatorKeyPair,
    };
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_offline_validator_catches_up_after_reconnect() {
        let devnet = devnet();
        devnet.disconnect(3);

        for nonce in 1..=3 {
            let tx = transfer(&devnet, 0, 1, 10, nonce);
            devnet.submit(&tx);
            wait_for_height(&devnet, &[0, 1, 2], nonce).await;
        }
        assert_eq!(devnet.node(3).unwrap().committed_height(), 0);

        devnet.reconnect(3);
        wait_for_height(&devnet, &[3], 3).await;
        let lagging = devnet.node(3).unwrap().ledger().view();
        let healthy = devnet.node(0).unwrap().ledger().view();
        assert_eq!(lagging.state_root, healthy.state_root);
        assert_eq!(lagging.head, healthy.head);

        // Back in the voting set for the following height.
        let tx = transfer(&devnet, 0, 1, 10, 4);
        devnet.submit(&tx);
        wait_for_height(&devnet, &[0, 1, 2, 3], 4).await;
        wait_until("all nodes agree on height 4", || {
            let hashes: Vec<_> = devnet
                .nodes()
                .iter()
                .filter_map(|n| n.ledger().block_at(4))
                .map(|b| b.hash)
                .collect();
            hashes.len() == 4 && hashes.windows(2).all(|w| w[0] == w[1])
        })
        .await;
        devnet.shutdown().await;
    }

    fn funded(balance: u64) -> AccountSet {
        let mut accounts = AccountSet::new();
        accounts.insert([0x42; 20], AccountState { balance, nonce: 3 });
        accounts
    }

    /// Answers every snapshot request on `inbox` with `snapshot`.
    fn serve(
        endpoint: node_runtime::adapters::NetworkEndpoint,
        mut inbox: tokio::sync::mpsc::Receiver<shared_types::Envelope>,
        snapshot: StateSnapshot,
    ) {
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                if let NetworkMessage::SnapshotRequest { request_id, .. } = envelope.message {
                    let reply = NetworkMessage::SnapshotResponse {
                        request_id,
                        snapshot: Some(snapshot.clone()),
                    };
                    let _ = PeerTransport::send(&endpoint, &envelope.from, reply).await;
                }
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_tampered_snapshot_rejected_then_honest_peer_used() {
        let local = ValidatorKeyPair::from_seed([1; 32]).public_key();
        let liar = ValidatorKeyPair::from_seed([2; 32]).public_key();
        let honest = ValidatorKeyPair::from_seed([3; 32]).public_key();
        let hub = InProcessNetwork::new(NetworkConfig::default());

        let (endpoint, mut local_inbox) = hub.join(local);
        let source = Arc::new(NetworkSnapshotSource::new(Arc::new(endpoint)));
        {
            let source = Arc::clone(&source);
            tokio::spawn(async move {
                while let Some(envelope) = local_inbox.recv().await {
                    if let NetworkMessage::SnapshotResponse { request_id, snapshot } = envelope.message {
                        source.complete(request_id, snapshot);
                    }
                }
            });
        }

        // The liar inflates a balance after the root was computed.
        let mut forged = StateSnapshot::new(9, [9; 32], funded(500));
        forged.accounts.insert([0x42; 20], AccountState { balance: 1_000_000, nonce: 3 });
        let (liar_endpoint, liar_inbox) = hub.join(liar);
        serve(liar_endpoint, liar_inbox, forged);

        let genuine = StateSnapshot::new(7, [7; 32], funded(500));
        let (honest_endpoint, honest_inbox) = hub.join(honest);
        serve(honest_endpoint, honest_inbox, genuine.clone());

        let ledger = Arc::new(InMemoryLedgerStore::new(AccountSet::new()));
        let mut sync = StateSyncService::new(SyncConfig::for_testing(), ledger.clone(), source);

        let outcome = sync.run(&[(liar, 9), (honest, 7)]).await;
        assert_eq!(
            outcome,
            SyncOutcome::CaughtUp {
                height: 7,
                block_hash: [7; 32]
            }
        );
        // One failed attempt, against the liar.
        assert_eq!(sync.attempts(), 1);
        assert!(matches!(
            sync.last_error(),
            Some(SyncError::RootMismatch { height: 9 })
        ));
        let failed = sync.failed_peers();
        assert_eq!(failed, &[(liar, SyncError::RootMismatch { height: 9 })]);
        assert!(failed[0].1.discredits_peer());
        assert_eq!(ledger.head().height, 7);
        assert_eq!(ledger.view().state_root, genuine.state_root);
        assert_eq!(ledger.view().account(&[0x42; 20]).balance, 500);
    }
}
