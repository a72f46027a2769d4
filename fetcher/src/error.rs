use thiserror::Error;

use wisp_types::{Hash, PeerId, Weight};

/// Protocol violations detected while recording announcements. These are
/// surfaced to the peer lifecycle bridge for peer-drop consideration; they
/// are never internal errors of the fetcher itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// A peer announced a head with lower cumulative weight than its own
    /// previous announcement.
    #[error("peer {peer} announced weight {announced} below its previous {previous}")]
    WeightRegression {
        peer: PeerId,
        previous: Weight,
        announced: Weight,
    },

    /// An announced head does not weigh more than its known parent, breaking
    /// the strict monotonicity of cumulative weight.
    #[error("head {hash} weight {weight} not above parent weight {parent_weight}")]
    NonMonotonicWeight {
        hash: Hash,
        weight: Weight,
        parent_weight: Weight,
    },
}
