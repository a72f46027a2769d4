//! Head fetcher for the wisp light client.
//!
//! Peers announce chain heads; this crate keeps, per peer, the tree of head
//! candidates that peer has confirmed, weights candidates by how many
//! (optionally trusted) peers agree on them, and selects the best head to
//! sync to. Candidates at or below the already-confirmed cumulative weight
//! are pruned and never come back.

pub mod error;
pub mod fetcher;
pub mod tree;
pub mod trust;

pub use error::FetchError;
pub use fetcher::{BestRequest, HeadFetcher, SyncMode};
pub use tree::{AnnouncementTree, TreeNode};
pub use trust::TrustConfig;
