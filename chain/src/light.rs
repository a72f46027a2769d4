//! Header-only chain — the local storage of a light client.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use wisp_types::{Hash, Header, Weight};

use crate::error::ChainError;

/// The current best header: hash, height, and cumulative weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHead {
    pub hash: Hash,
    pub number: u64,
    pub weight: Weight,
}

struct ChainInner {
    /// All known headers keyed by hash (canonical and side chains alike).
    headers: HashMap<Hash, Header>,
    /// Cumulative weight per known header.
    weights: HashMap<Hash, Weight>,
    /// Canonical hash per height, rewritten when a heavier tip takes over.
    canonical: BTreeMap<u64, Hash>,
    head: ChainHead,
}

/// Thread-safe header chain. All multi-step mutation happens under a single
/// exclusive lock scoped to the mutating call, so readers always observe a
/// consistent chain.
pub struct HeaderChain {
    inner: RwLock<ChainInner>,
}

impl HeaderChain {
    /// Create a chain rooted at `genesis`. The genesis header's parent hash
    /// is not resolved; its cumulative weight equals its own weight step.
    pub fn new(genesis: Header) -> Self {
        let hash = genesis.hash();
        let head = ChainHead {
            hash,
            number: genesis.number,
            weight: genesis.weight_step,
        };
        let mut headers = HashMap::new();
        let mut weights = HashMap::new();
        let mut canonical = BTreeMap::new();
        headers.insert(hash, genesis.clone());
        weights.insert(hash, genesis.weight_step);
        canonical.insert(genesis.number, hash);
        Self {
            inner: RwLock::new(ChainInner {
                headers,
                weights,
                canonical,
                head,
            }),
        }
    }

    pub fn get_header(&self, hash: &Hash) -> Option<Header> {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.headers.get(hash).cloned()
    }

    pub fn get_header_by_number(&self, number: u64) -> Option<Header> {
        let inner = self.inner.read().expect("chain lock poisoned");
        let hash = inner.canonical.get(&number)?;
        inner.headers.get(hash).cloned()
    }

    /// Cumulative weight of a known header, or `None` when the header is
    /// unknown.
    pub fn get_total_weight(&self, hash: &Hash) -> Option<Weight> {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.weights.get(hash).copied()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.headers.contains_key(hash)
    }

    pub fn head(&self) -> ChainHead {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.head
    }

    pub fn header_count(&self) -> usize {
        let inner = self.inner.read().expect("chain lock poisoned");
        inner.headers.len()
    }

    /// Insert an ordered batch of headers (ascending by height, each the
    /// parent of the next). Returns the number of newly inserted headers.
    ///
    /// The whole batch is applied under one exclusive lock, so concurrent
    /// readers see either none or all of it. `check_freq` controls how often
    /// the weight-step invariant is verified: every `check_freq`-th header
    /// plus the final one; `0` checks every header.
    ///
    /// Headers already known are skipped without counting. On failure the
    /// error reports how many headers had been applied; the chain keeps
    /// those — partial progress is valid chain data.
    pub fn insert_header_chain(
        &self,
        headers: &[Header],
        check_freq: usize,
    ) -> Result<usize, ChainError> {
        let mut inner = self.inner.write().expect("chain lock poisoned");
        let mut inserted = 0usize;

        for (i, header) in headers.iter().enumerate() {
            let hash = header.hash();
            if inner.headers.contains_key(&hash) {
                continue;
            }
            let checked = check_freq <= 1 || i % check_freq == 0 || i == headers.len() - 1;
            if checked && header.weight_step.is_zero() {
                return Err(ChainError::ZeroWeightStep { hash, inserted });
            }
            let parent_weight = match inner.weights.get(&header.parent_hash) {
                Some(w) => *w,
                None => {
                    return Err(ChainError::UnknownParent {
                        hash,
                        parent: header.parent_hash,
                        inserted,
                    })
                }
            };
            let weight = parent_weight.saturating_add(header.weight_step);
            inner.headers.insert(hash, header.clone());
            inner.weights.insert(hash, weight);
            inserted += 1;

            if weight > inner.head.weight {
                Self::reorg_to(&mut inner, hash, header.number, weight);
            }
        }

        if inserted > 0 {
            let head = inner.head;
            tracing::debug!(
                inserted,
                head = %head.hash,
                number = head.number,
                "inserted header chain"
            );
        }
        Ok(inserted)
    }

    /// Move the canonical mapping to the chain ending at `hash`.
    fn reorg_to(inner: &mut ChainInner, hash: Hash, number: u64, weight: Weight) {
        inner.head = ChainHead {
            hash,
            number,
            weight,
        };
        // Rewrite canonical entries back to the fork point.
        inner.canonical.split_off(&(number + 1));
        let mut cursor = hash;
        let mut height = number;
        loop {
            if inner.canonical.get(&height) == Some(&cursor) {
                break;
            }
            inner.canonical.insert(height, cursor);
            let Some(header) = inner.headers.get(&cursor) else {
                break;
            };
            if height == 0 {
                break;
            }
            cursor = header.parent_hash;
            height -= 1;
        }
    }
}
