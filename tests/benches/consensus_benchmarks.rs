//! # Quorum-Ledger Consensus Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | ql-02 Vote Aggregation | Tally a full round of signed votes | < 10ms for 100 validators |
//! | ql-05 Shard Router | Partition, validate and merge a block | < 100ms for 1000 txs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ql_01_peer_registry::VotingSet;
use ql_02_vote_aggregation::VoteAggregator;
use ql_05_shard_router::{shard_state_roots, ShardConfig, ShardRouter};
use rand::Rng;
use shared_types::{AccountSet, AccountState, Transaction, ValidatorKeyPair, Vote, VoteKind};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// QL-02: Vote Aggregation
// ============================================================================

fn bench_vote_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("ql-02-vote-aggregation");
    group.measurement_time(Duration::from_secs(5));

    for validators in [4u8, 16, 100] {
        let keys: Vec<_> = (1..=validators)
            .map(|i| ValidatorKeyPair::from_seed([i; 32]))
            .collect();
        let set = Arc::new(VotingSet::new(
            keys.iter().map(|k| (k.public_key(), 1)).collect(),
        ));
        let votes: Vec<_> = keys
            .iter()
            .map(|k| Vote::signed(k, 1, 0, VoteKind::Prevote, [7; 32]))
            .collect();

        group.throughput(Throughput::Elements(validators as u64));
        group.bench_with_input(
            BenchmarkId::new("full_round", validators),
            &votes,
            |b, votes| {
                b.iter(|| {
                    let mut aggregator = VoteAggregator::new(1, Arc::clone(&set));
                    for vote in votes {
                        let _ = aggregator.add_vote(vote.clone());
                    }
                    black_box(aggregator.tally(1, 0, VoteKind::Prevote))
                })
            },
        );
    }
    group.finish();
}

// ============================================================================
// QL-05: Shard Router
// ============================================================================

fn bench_shard_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("ql-05-shard-router");
    group.measurement_time(Duration::from_secs(5));

    let senders: Vec<_> = (0..64u8)
        .map(|i| ValidatorKeyPair::from_seed([0x80 ^ i; 32]))
        .collect();
    let accounts: AccountSet = senders
        .iter()
        .map(|k| (k.address(), AccountState { balance: u64::MAX / 2, nonce: 0 }))
        .collect();

    for (shards, txs) in [(1u16, 1000usize), (4, 1000), (16, 1000)] {
        let mut rng = rand::thread_rng();
        let batch: Vec<Transaction> = (0..txs)
            .map(|i| {
                let from = &senders[i % senders.len()];
                let to = senders[rng.gen_range(0..senders.len())].address();
                Transaction::signed(from, to, 1, (i / senders.len()) as u64 + 1)
            })
            .collect();
        let parent_roots = shard_state_roots(&accounts, shards);

        group.throughput(Throughput::Elements(txs as u64));
        group.bench_with_input(BenchmarkId::new("partition_merge", shards), &batch, |b, batch| {
            b.iter(|| {
                let mut router = ShardRouter::new(ShardConfig { shard_count: shards }).unwrap();
                let partition = router.partition(batch.clone());
                let blocks = router.build_shard_blocks(partition, 1, &parent_roots).unwrap();
                black_box(router.merge_shard_blocks(blocks, 1, &parent_roots))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_vote_tally, bench_shard_merge);
criterion_main!(benches);
