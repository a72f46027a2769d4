//! Typed peer requests and inbound announcements.
//!
//! Requests travel over an in-process channel per peer; the reply arrives on
//! a oneshot sender carried inside the request. How requests are framed on
//! the wire is the transport layer's concern.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use wisp_types::{AccountProof, Address, Body, Hash, Header, Receipt, TxStatusProof, Weight};

/// A new-head announcement received from a peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub hash: Hash,
    pub number: u64,
    /// Cumulative weight the peer claims for this head.
    pub weight: Weight,
    pub parent_hash: Hash,
}

/// A request dispatched to one peer. Each variant carries the oneshot the
/// serving side answers on; `None` replies mean the peer does not have the
/// data.
#[derive(Debug)]
pub enum PeerRequest {
    /// The chain segment of up to `count` headers ending at `to`, ascending
    /// by height.
    Headers {
        to: Hash,
        count: u64,
        reply: oneshot::Sender<Vec<Header>>,
    },
    Block {
        hash: Hash,
        reply: oneshot::Sender<Option<Body>>,
    },
    Receipts {
        hash: Hash,
        reply: oneshot::Sender<Option<Vec<Receipt>>>,
    },
    AccountProof {
        state_root: Hash,
        address: Address,
        reply: oneshot::Sender<Option<AccountProof>>,
    },
    TxStatus {
        hash: Hash,
        reply: oneshot::Sender<Option<TxStatusProof>>,
    },
}
