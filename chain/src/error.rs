use thiserror::Error;

use wisp_types::Hash;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// A header's parent is not present in the chain. `inserted` reports how
    /// many headers of the batch were applied before the failure.
    #[error("unknown parent {parent} for header {hash} ({inserted} inserted)")]
    UnknownParent {
        hash: Hash,
        parent: Hash,
        inserted: usize,
    },

    /// A header carries a zero weight step, which would break the strict
    /// monotonicity of cumulative weight along a chain.
    #[error("zero weight step in header {hash} ({inserted} inserted)")]
    ZeroWeightStep { hash: Hash, inserted: usize },
}
