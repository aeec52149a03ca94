//! # Shard Root Tree
//!
//! Binary Keccak-256 tree over the per-shard parent state roots, leaves in
//! shard order. Its root is the `shard_root` a block commits to, so a
//! [`ShardProof`] ties one shard's state root to a block without the roots
//! of the other shards.
//!
//! Leaves and inner nodes are hashed under different prefixes. A level with
//! an odd node count carries its last node up unchanged.

use crate::domain::{ShardId, ShardProof};
use sha3::{Digest, Keccak256};
use shared_types::Hash;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

fn leaf_hash(state_root: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(state_root);
    hasher.finalize().into()
}

fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(left, right),
            carried => carried[0],
        })
        .collect()
}

/// Root of the tree over `parent_roots`. An empty slice hashes to the
/// Keccak digest of nothing.
pub fn compute_shard_root(parent_roots: &[Hash]) -> Hash {
    if parent_roots.is_empty() {
        return Keccak256::digest(b"").into();
    }
    let mut level: Vec<Hash> = parent_roots.iter().map(leaf_hash).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Inclusion proof for `shard`, or `None` when it is out of range.
pub fn shard_root_proof(parent_roots: &[Hash], shard: ShardId) -> Option<ShardProof> {
    let mut index = shard as usize;
    if index >= parent_roots.len() {
        return None;
    }
    let mut level: Vec<Hash> = parent_roots.iter().map(leaf_hash).collect();
    let mut siblings = Vec::new();
    while level.len() > 1 {
        if let Some(sibling) = level.get(index ^ 1) {
            siblings.push(*sibling);
        }
        level = next_level(&level);
        index /= 2;
    }
    Some(ShardProof {
        shard_id: shard,
        shard_count: parent_roots.len() as u16,
        siblings,
    })
}

/// Whether `proof` places `state_root` at its shard under `shard_root`.
pub fn verify_shard_proof(proof: &ShardProof, state_root: &Hash, shard_root: &Hash) -> bool {
    if proof.shard_id >= proof.shard_count {
        return false;
    }
    let mut hash = leaf_hash(state_root);
    let mut index = proof.shard_id as usize;
    let mut width = proof.shard_count as usize;
    let mut siblings = proof.siblings.iter();
    while width > 1 {
        if index ^ 1 < width {
            let Some(sibling) = siblings.next() else {
                return false;
            };
            hash = if index % 2 == 0 {
                node_hash(&hash, sibling)
            } else {
                node_hash(sibling, &hash)
            };
        }
        index /= 2;
        width = width.div_ceil(2);
    }
    siblings.next().is_none() && hash == *shard_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roots(n: u8) -> Vec<Hash> {
        (0..n).map(|i| [i.wrapping_add(1); 32]).collect()
    }

    #[test]
    fn test_three_shard_tree_shape() {
        let r = roots(3);
        let left = node_hash(&leaf_hash(&r[0]), &leaf_hash(&r[1]));
        let expected = node_hash(&left, &leaf_hash(&r[2]));
        assert_eq!(compute_shard_root(&r), expected);

        // The carried leaf only needs the left subtree.
        let proof = shard_root_proof(&r, 2).unwrap();
        assert_eq!(proof.siblings, vec![left]);
        assert!(verify_shard_proof(&proof, &r[2], &expected));
    }

    #[test]
    fn test_single_shard_root_is_its_leaf() {
        let r = roots(1);
        assert_eq!(compute_shard_root(&r), leaf_hash(&r[0]));
        let proof = shard_root_proof(&r, 0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(verify_shard_proof(&proof, &r[0], &compute_shard_root(&r)));
    }

    #[test]
    fn test_proof_rejects_wrong_leaf_root_or_shard() {
        let r = roots(5);
        let root = compute_shard_root(&r);
        let proof = shard_root_proof(&r, 3).unwrap();

        assert!(verify_shard_proof(&proof, &r[3], &root));
        assert!(!verify_shard_proof(&proof, &r[2], &root));
        assert!(!verify_shard_proof(&proof, &r[3], &[0; 32]));

        let moved = ShardProof { shard_id: 2, ..proof.clone() };
        assert!(!verify_shard_proof(&moved, &r[3], &root));

        let mut padded = proof.clone();
        padded.siblings.push([9; 32]);
        assert!(!verify_shard_proof(&padded, &r[3], &root));

        let out_of_range = ShardProof { shard_id: 5, ..proof };
        assert!(!verify_shard_proof(&out_of_range, &r[3], &root));
        assert!(shard_root_proof(&r, 5).is_none());
    }

    #[test]
    fn test_root_depends_on_order() {
        let mut r = roots(4);
        let root = compute_shard_root(&r);
        r.swap(0, 1);
        assert_ne!(compute_shard_root(&r), root);
    }

    proptest! {
        #[test]
        fn prop_every_shard_proves_against_root(count in 1u8..=33, salt in any::<u8>()) {
            let r: Vec<Hash> = (0..count).map(|i| [i ^ salt; 32]).collect();
            let root = compute_shard_root(&r);
            for shard in 0..count as u16 {
                let proof = shard_root_proof(&r, shard).unwrap();
                prop_assert!(verify_shard_proof(&proof, &r[shard as usize], &root));
            }
        }
    }
}
