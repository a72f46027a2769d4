//! Block header — the trust anchor for all retrieved data.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::weight::Weight;

/// A block header. Every on-demand retrieval is validated against the roots
/// committed here; headers themselves are obtained through the sync driver
/// and are the only chain data a light client stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Height of this block.
    pub number: u64,
    /// Hash of the parent header.
    pub parent_hash: Hash,
    /// Commitment to the account state after this block.
    pub state_root: Hash,
    /// Commitment to this block's receipts.
    pub receipts_root: Hash,
    /// Commitment to this block's transactions.
    pub tx_root: Hash,
    /// Weight this block contributes on top of its parent's cumulative
    /// weight. Must be non-zero for a valid header.
    pub weight_step: Weight,
}

impl Header {
    /// Canonical header hash: Blake2b-256 over the bincode encoding.
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(self).expect("header encoding is infallible");
        Hash::digest(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(number: u64) -> Header {
        Header {
            number,
            parent_hash: Hash::ZERO,
            state_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            tx_root: Hash::ZERO,
            weight_step: Weight::new(1),
        }
    }

    #[test]
    fn hash_changes_with_contents() {
        assert_ne!(header(1).hash(), header(2).hash());
        assert_eq!(header(1).hash(), header(1).hash());
    }

    #[test]
    fn hash_depends_on_roots() {
        let mut h = header(1);
        let base = h.hash();
        h.state_root = Hash::digest(b"state");
        assert_ne!(h.hash(), base);
    }
}
