//! Block bodies, transactions, and receipts.

use serde::{Deserialize, Serialize};

use crate::account::Address;
use crate::hash::Hash;
use crate::proof::merkle_root;

/// A transaction. Kept deliberately small — validity rules are out of scope
/// for the sync core; only identity (hashing) and inclusion matter here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub input: Vec<u8>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(self).expect("transaction encoding is infallible");
        Hash::digest(&bytes)
    }
}

/// A block body: the transactions committed to by a header's `tx_root`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub transactions: Vec<Transaction>,
}

impl Body {
    /// Merkle root over the transaction hashes, matched against the
    /// anchor header's `tx_root` during validation.
    pub fn tx_root(&self) -> Hash {
        let leaves: Vec<Hash> = self.transactions.iter().map(|tx| tx.hash()).collect();
        merkle_root(&leaves)
    }
}

/// Execution receipt for one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: Hash,
    pub success: bool,
    pub gas_used: u64,
}

impl Receipt {
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(self).expect("receipt encoding is infallible");
        Hash::digest(&bytes)
    }
}

/// Merkle root over a block's receipts, matched against the anchor header's
/// `receipts_root` during validation.
pub fn receipts_root(receipts: &[Receipt]) -> Hash {
    let leaves: Vec<Hash> = receipts.iter().map(|r| r.hash()).collect();
    merkle_root(&leaves)
}
