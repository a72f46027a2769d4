//! Account state and the deterministic light-execution function.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::Hash;

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Account state committed to by a header's `state_root`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub nonce: u64,
    pub balance: u128,
    pub code_hash: Hash,
}

impl Account {
    /// Leaf hash binding this account to its address in the state
    /// commitment.
    pub fn leaf_hash(&self, address: &Address) -> Hash {
        let mut bytes = Vec::with_capacity(20 + 64);
        bytes.extend_from_slice(address.as_bytes());
        bytes.extend_from_slice(
            &bincode::serialize(self).expect("account encoding is infallible"),
        );
        Hash::digest(&bytes)
    }
}

/// Deterministic contract-call function evaluated locally over a proven
/// account. Both the full-node shortcut and the ODR path compute calls with
/// this same function, so results are byte-identical whenever the underlying
/// account state matches.
pub fn execute_call(account: &Account, input: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32 + input.len() + 16);
    bytes.extend_from_slice(account.code_hash.as_bytes());
    bytes.extend_from_slice(input);
    bytes.extend_from_slice(&account.balance.to_le_bytes());
    Hash::digest(&bytes).as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: u128) -> Account {
        Account {
            nonce: 1,
            balance,
            code_hash: Hash::digest(b"code"),
        }
    }

    #[test]
    fn leaf_hash_binds_address() {
        let acct = account(100);
        let a = acct.leaf_hash(&Address::new([1u8; 20]));
        let b = acct.leaf_hash(&Address::new([2u8; 20]));
        assert_ne!(a, b);
    }

    #[test]
    fn call_output_depends_on_state_and_input() {
        let out = execute_call(&account(100), b"input");
        assert_eq!(out, execute_call(&account(100), b"input"));
        assert_ne!(out, execute_call(&account(101), b"input"));
        assert_ne!(out, execute_call(&account(100), b"other"));
    }
}
