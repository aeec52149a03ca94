//! # Faulty Validators and Failing Storage
//!
//! Equivocation evidence is recorded without stalling the honest quorum,
//! an inflated height announcement does not send honest nodes syncing, and
//! a node whose ledger refuses writes steps back to observing until a
//! commit goes through.

#[cfg(test)]
mod tests {
    use crate::integration::support::{
        assert_same_block, devnet, transfer, wait_for_height, wait_until,
    };
    use shared_types::{
        NetworkMessage, ObserverReason, Participation, PeerTransport, ValidatorKeyPair, Vote,
        VoteKind,
    };

    #[tokio::test(start_paused = true)]
    async fn test_equivocating_validator_is_recorded_and_quorum_continues() {
        let devnet = devnet();
        let offender = devnet.genesis().validators[0].clone();

        // Two conflicting precommits signed with validator 0's key, injected
        // by a rogue peer.
        let rogue = ValidatorKeyPair::from_seed([0x66; 32]).public_key();
        let (endpoint, _inbox) = devnet.network().join(rogue);
        for hash in [[0xA1; 32], [0xB2; 32]] {
            let vote = Vote::signed(&offender, 1, 0, VoteKind::Precommit, hash);
            PeerTransport::broadcast(&endpoint, NetworkMessage::Vote(vote))
                .await
                .unwrap();
        }

        wait_until("equivocation recorded", || {
            devnet.nodes()[1..].iter().all(|n| n.status().faults > 0)
        })
        .await;

        let tx = transfer(&devnet, 1, 2, 7, 1);
        devnet.submit(&tx);
        wait_for_height(&devnet, &[0, 1, 2, 3], 1).await;
        assert_same_block(&devnet, &[0, 1, 2, 3], 1);
        devnet.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_makes_node_observer_until_recovery() {
        let devnet = devnet();
        let failing = devnet.node(2).unwrap();
        failing.ledger().set_unavailable(true);

        let tx = transfer(&devnet, 0, 3, 40, 1);
        assert_eq!(devnet.submit(&tx), 4);
        wait_for_height(&devnet, &[0, 1, 3], 1).await;
        wait_until("storage observer", || {
            failing.status().participation == Participation::Observer(ObserverReason::StorageFailure)
        })
        .await;
        assert_eq!(failing.committed_height(), 0);

        failing.ledger().set_unavailable(false);
        wait_for_height(&devnet, &[2], 1).await;
        wait_until("voting again", || {
            failing.status().participation == Participation::Voting
        })
        .await;
        assert_same_block(&devnet, &[0, 1, 2, 3], 1);

        // The recovered node takes part in the next height.
        let tx = transfer(&devnet, 0, 3, 40, 2);
        devnet.submit(&tx);
        wait_for_height(&devnet, &[0, 1, 2, 3], 2).await;
        assert_same_block(&devnet, &[0, 1, 2, 3], 2);
        devnet.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inflated_heartbeat_does_not_stall_honest_validators() {
        let devnet = devnet();
        let tx = transfer(&devnet, 0, 1, 10, 1);
        devnet.submit(&tx);
        wait_for_height(&devnet, &[0, 1, 2, 3], 1).await;

        // Validator 3's identity is taken over and claims absurd heights.
        let liar = devnet.genesis().validators[3].public_key();
        let (endpoint, _inbox) = devnet.network().join(liar);
        for height in [1_000_000, u64::MAX] {
            let heartbeat = NetworkMessage::PeerHeartbeat {
                height,
                voter_id: liar,
            };
            PeerTransport::broadcast(&endpoint, heartbeat).await.unwrap();
        }

        let tx = transfer(&devnet, 0, 1, 10, 2);
        devnet.submit(&tx);
        wait_for_height(&devnet, &[0, 1, 2], 2).await;
        assert_same_block(&devnet, &[0, 1, 2], 2);
        for node in &devnet.nodes()[..3] {
            assert_eq!(node.status().participation, Participation::Voting);
        }
        devnet.shutdown().await;
    }
}
