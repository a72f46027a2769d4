//! Per-peer handle: identity, trust flag, advertised head, request channel.

use std::sync::RwLock;

use tokio::sync::{mpsc, oneshot};

use wisp_types::{AccountProof, Address, Body, Hash, Header, PeerId, Receipt, TxStatusProof};

use crate::error::NetError;
use crate::message::{Announcement, PeerRequest};

/// The most recent head a peer has announced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvertisedHead {
    pub hash: Hash,
    pub number: u64,
    pub weight: wisp_types::Weight,
}

/// Non-owning view of a connected peer. The transport side holds the
/// receiving end of `requests` and serves them; everything else in the core
/// shares the handle through `Arc`.
#[derive(Debug)]
pub struct PeerHandle {
    id: PeerId,
    trusted: bool,
    requests: mpsc::Sender<PeerRequest>,
    head: RwLock<Option<AdvertisedHead>>,
}

impl PeerHandle {
    pub fn new(id: PeerId, trusted: bool, requests: mpsc::Sender<PeerRequest>) -> Self {
        Self {
            id,
            trusted,
            requests,
            head: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Record the head from a received announcement. Heads are taken in
    /// arrival order; the fetcher, not the handle, judges regressions.
    pub fn record_head(&self, announcement: &Announcement) {
        let mut head = self.head.write().expect("peer head lock poisoned");
        *head = Some(AdvertisedHead {
            hash: announcement.hash,
            number: announcement.number,
            weight: announcement.weight,
        });
    }

    pub fn head(&self) -> Option<AdvertisedHead> {
        *self.head.read().expect("peer head lock poisoned")
    }

    /// Advertised-availability hint: does this peer claim to hold the block
    /// at `number`? With `strict` set, a peer that has not announced yet is
    /// assumed not to; otherwise it gets the benefit of the doubt.
    pub fn has_block(&self, number: u64, strict: bool) -> bool {
        match self.head() {
            Some(head) => number <= head.number,
            None => !strict,
        }
    }

    async fn roundtrip<T>(
        &self,
        request: PeerRequest,
        reply: oneshot::Receiver<T>,
    ) -> Result<T, NetError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| NetError::PeerUnavailable(self.id.clone()))?;
        reply
            .await
            .map_err(|_| NetError::PeerUnavailable(self.id.clone()))
    }

    /// Request the chain segment of up to `count` headers ending at `to`,
    /// ascending by height.
    pub async fn request_headers(&self, to: Hash, count: u64) -> Result<Vec<Header>, NetError> {
        let (tx, rx) = oneshot::channel();
        self.roundtrip(PeerRequest::Headers { to, count, reply: tx }, rx)
            .await
    }

    pub async fn request_block(&self, hash: Hash) -> Result<Option<Body>, NetError> {
        let (tx, rx) = oneshot::channel();
        self.roundtrip(PeerRequest::Block { hash, reply: tx }, rx)
            .await
    }

    pub async fn request_receipts(&self, hash: Hash) -> Result<Option<Vec<Receipt>>, NetError> {
        let (tx, rx) = oneshot::channel();
        self.roundtrip(PeerRequest::Receipts { hash, reply: tx }, rx)
            .await
    }

    pub async fn request_account_proof(
        &self,
        state_root: Hash,
        address: Address,
    ) -> Result<Option<AccountProof>, NetError> {
        let (tx, rx) = oneshot::channel();
        self.roundtrip(
            PeerRequest::AccountProof {
                state_root,
                address,
                reply: tx,
            },
            rx,
        )
        .await
    }

    pub async fn request_tx_status(&self, hash: Hash) -> Result<Option<TxStatusProof>, NetError> {
        let (tx, rx) = oneshot::channel();
        self.roundtrip(PeerRequest::TxStatus { hash, reply: tx }, rx)
            .await
    }
}
