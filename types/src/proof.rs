//! Merkle audit paths and the proof payloads carried by peer responses.
//!
//! Commitments are binary merkle trees over leaf hashes; an odd node at any
//! level is paired with itself. An [`AuditPath`] carries the sibling hashes
//! from a leaf up to the root, so a verifier holding only the root (from a
//! trusted header) can check that a leaf is included.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::block::Transaction;
use crate::hash::Hash;

/// Compute the merkle root over a set of leaf hashes.
///
/// An empty set commits to [`Hash::ZERO`].
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return Hash::ZERO;
    }
    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            next.push(Hash::combine(&pair[0], right));
        }
        level = next;
    }
    level[0]
}

/// One step of an audit path: the sibling hash and whether it sits on the
/// left of the running hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub sibling: Hash,
    pub sibling_on_left: bool,
}

/// Sibling hashes from a leaf up to a merkle root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPath {
    pub steps: Vec<PathStep>,
}

impl AuditPath {
    /// Build the audit path for `leaves[index]`.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn build(leaves: &[Hash], index: usize) -> Option<Self> {
        if leaves.is_empty() || index >= leaves.len() {
            return None;
        }
        let mut steps = Vec::new();
        let mut level: Vec<Hash> = leaves.to_vec();
        let mut pos = index;
        while level.len() > 1 {
            let sibling_pos = pos ^ 1;
            let sibling = *level.get(sibling_pos).unwrap_or(&level[pos]);
            steps.push(PathStep {
                sibling,
                sibling_on_left: pos % 2 == 1,
            });
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(Hash::combine(&pair[0], right));
            }
            level = next;
            pos /= 2;
        }
        Some(Self { steps })
    }

    /// Leaf position this path proves. Each step's side records one bit of
    /// the position, least significant first, so a claimed index can be
    /// checked against what the path actually commits to.
    pub fn leaf_index(&self) -> u32 {
        self.steps
            .iter()
            .enumerate()
            .fold(0, |index, (depth, step)| {
                index | ((step.sibling_on_left as u32) << depth)
            })
    }

    /// Fold the path over `leaf` and return the resulting root.
    pub fn resolve(&self, leaf: Hash) -> Hash {
        let mut acc = leaf;
        for step in &self.steps {
            acc = if step.sibling_on_left {
                Hash::combine(&step.sibling, &acc)
            } else {
                Hash::combine(&acc, &step.sibling)
            };
        }
        acc
    }
}

/// Proof that an account exists under a header's `state_root`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProof {
    pub account: Account,
    pub path: AuditPath,
}

/// Proof that a transaction is included in a specific block, together with
/// its reported position. Validated against the `tx_root` of the locally
/// known header for `block_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatusProof {
    pub transaction: Transaction,
    pub block_hash: Hash,
    pub block_number: u64,
    pub index: u32,
    pub path: AuditPath,
}
