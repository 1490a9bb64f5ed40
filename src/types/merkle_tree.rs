//! Merkle root over transaction hashes, bound into a state block's `txs_hash`.
//!
//! Behavior:
//! - An empty list of leaves yields the all-zero hash (`Hash::zero()`).
//! - Odd layers are padded by duplicating the last node before hashing the pair.
//! - Leaves are the SHA3-256 digests of the transaction hash text.

use crate::types::hash::Hash;

const EMPTY_ROOT: Hash = Hash::zero();
const LEAF_SEPARATOR: &[u8] = b"STATELEDGER_TX_LEAF";
const NODE_SEPARATOR: &[u8] = b"STATELEDGER_TX_NODE";

/// Builds Merkle roots from transaction hashes.
pub struct MerkleTree;

impl MerkleTree {
    fn hash_leaf(tx_hash: &str) -> Hash {
        let mut h = Hash::sha3();
        h.update(LEAF_SEPARATOR);
        h.update(tx_hash.as_bytes());
        h.finalize()
    }

    fn hash_pair(left: Hash, right: Hash) -> Hash {
        let mut h = Hash::sha3();
        h.update(NODE_SEPARATOR);
        h.update(left.as_slice());
        h.update(right.as_slice());
        h.finalize()
    }

    /// Reduces a layer of nodes in place to a single root.
    pub fn from_raw(mut nodes: Vec<Hash>) -> Hash {
        if nodes.is_empty() {
            return EMPTY_ROOT;
        }

        let mut len = nodes.len();
        while len > 1 {
            let mut write = 0;
            let mut read = 0;

            while read < len {
                let left = nodes[read];
                let right = if read + 1 < len { nodes[read + 1] } else { left };
                nodes[write] = Self::hash_pair(left, right);
                write += 1;
                read += 2;
            }

            len = write;
        }

        nodes[0]
    }

    /// Computes the root for an ordered list of transaction hashes.
    pub fn from_hashes<S: AsRef<str>>(tx_hashes: &[S]) -> Hash {
        let leaves = tx_hashes
            .iter()
            .map(|h| Self::hash_leaf(h.as_ref()))
            .collect();
        Self::from_raw(leaves)
    }
}
