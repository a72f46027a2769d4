//! 32-byte hash type and the canonical digest function.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// A 32-byte hash — identifies headers, blocks, transactions, and commits
/// merkle roots. Ordered so that equal-weight candidates can be tie-broken
/// deterministically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Default for Hash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Hash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Blake2b-256 digest of arbitrary bytes.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Digest of two concatenated hashes — the merkle inner-node function.
    pub fn combine(left: &Hash, right: &Hash) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(left.0);
        hasher.update(right.0);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Hash::digest(b"wisp");
        let b = Hash::digest(b"wisp");
        assert_eq!(a, b);
        assert_ne!(a, Hash::digest(b"wasp"));
    }

    #[test]
    fn combine_is_order_sensitive() {
        let a = Hash::digest(b"a");
        let b = Hash::digest(b"b");
        assert_ne!(Hash::combine(&a, &b), Hash::combine(&b, &a));
    }

    #[test]
    fn display_is_full_hex() {
        let h = Hash::new([0xAB; 32]);
        assert_eq!(h.to_string(), "ab".repeat(32));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let lo = Hash::new([0x01; 32]);
        let hi = Hash::new([0x02; 32]);
        assert!(lo < hi);
    }
}
