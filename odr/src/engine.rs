//! The retrieval engine: deduplication, peer selection, retry, caching.

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use wisp_chain::{FullBackend, HeaderChain};
use wisp_net::{PeerEvent, PeerHandle, PeerSet};
use wisp_types::PeerId;

use crate::error::OdrError;
use crate::request::{Payload, RequestKey, Retrieval, TxStatusRecord};
use crate::validate::{dispatch, Outcome};

/// Timing knobs for retrievals.
#[derive(Clone, Copy, Debug)]
pub struct OdrConfig {
    /// Budget for one dispatch against one peer.
    pub dispatch_timeout: Duration,
    /// Overall deadline for one request instance, across all retries.
    pub request_deadline: Duration,
    /// Upper bound on peers tried per request instance.
    pub max_attempts: usize,
}

impl Default for OdrConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(2),
            request_deadline: Duration::from_secs(10),
            max_attempts: 16,
        }
    }
}

struct EngineState {
    /// Waiters per in-flight key. Presence of a key means exactly one
    /// driver task is running for it.
    pending: HashMap<RequestKey, Vec<oneshot::Sender<Result<Payload, OdrError>>>>,
    /// Verified results, append-only for the session: proofs are anchored
    /// to immutable headers so entries never go stale.
    cache: HashMap<RequestKey, Payload>,
    /// Peers that returned an invalid proof this session. Never retried.
    blacklist: HashSet<PeerId>,
    /// Subscribers interested in misbehaving peers.
    violation_subs: Vec<mpsc::UnboundedSender<PeerId>>,
}

/// On-demand retrieval engine.
///
/// With a [`FullBackend`] attached, requests resolve locally without any
/// peer interaction (the full-node shortcut). Otherwise each distinct
/// request key gets one driver task that walks candidate peers until a
/// proof validates, peers run out, or the deadline passes; concurrent
/// identical requests attach as extra waiters on the same driver.
pub struct OdrEngine {
    chain: Arc<HeaderChain>,
    full: Option<Arc<FullBackend>>,
    peers: Arc<PeerSet>,
    config: OdrConfig,
    state: Mutex<EngineState>,
}

impl OdrEngine {
    pub fn new(chain: Arc<HeaderChain>, peers: Arc<PeerSet>, config: OdrConfig) -> Self {
        Self {
            chain,
            full: None,
            peers,
            config,
            state: Mutex::new(EngineState {
                pending: HashMap::new(),
                cache: HashMap::new(),
                blacklist: HashSet::new(),
                violation_subs: Vec::new(),
            }),
        }
    }

    /// Run with full chain data available: retrievals short-circuit to the
    /// backend and never touch the network.
    pub fn with_full_backend(full: Arc<FullBackend>, peers: Arc<PeerSet>, config: OdrConfig) -> Self {
        let chain = Arc::new(HeaderChain::new(full.genesis_header()));
        let mut engine = Self::new(chain, peers, config);
        engine.full = Some(full);
        engine
    }

    pub fn chain(&self) -> &Arc<HeaderChain> {
        &self.chain
    }

    /// Subscribe to proof-validation failures, reported as the misbehaving
    /// peer's id. The lifecycle bridge uses this to drop peers.
    pub fn violations(&self) -> mpsc::UnboundedReceiver<PeerId> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().expect("odr state lock poisoned");
        state.violation_subs.push(tx);
        rx
    }

    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().expect("odr state lock poisoned");
        state.pending.len()
    }

    /// Cached verified result for `key`, if the session already holds one.
    pub fn lookup_cached(&self, key: &RequestKey) -> Option<Payload> {
        let state = self.state.lock().expect("odr state lock poisoned");
        state.cache.get(key).cloned()
    }

    /// Number of cached verified results.
    pub fn cached_count(&self) -> usize {
        let state = self.state.lock().expect("odr state lock poisoned");
        state.cache.len()
    }

    /// Resolve a retrieval. Suspends until a validated payload arrives, the
    /// candidate peers are exhausted, or the deadline elapses. Dropping the
    /// returned future detaches this caller without affecting concurrent
    /// waiters for the same key.
    pub async fn retrieve(self: &Arc<Self>, retrieval: Retrieval) -> Result<Payload, OdrError> {
        if let Some(full) = &self.full {
            return Self::resolve_local(full, &retrieval);
        }

        let key = retrieval.key();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().expect("odr state lock poisoned");
            if let Some(hit) = state.cache.get(&key) {
                return Ok(hit.clone());
            }
            match state.pending.entry(key.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().push(tx),
                Entry::Vacant(entry) => {
                    entry.insert(vec![tx]);
                    tokio::spawn(Arc::clone(self).drive(retrieval, key.clone()));
                }
            }
        }
        // The driver settles every waiter exactly once; a closed channel can
        // only mean it aborted after all waiters cancelled.
        rx.await.map_err(|_| OdrError::Exhausted)?
    }

    /// Full-node shortcut: answer from local data, no peer selection and no
    /// proof validation. Fails only when the data simply does not exist.
    fn resolve_local(full: &FullBackend, retrieval: &Retrieval) -> Result<Payload, OdrError> {
        let payload = match retrieval {
            Retrieval::Block { hash, .. } => full.body(hash).map(Payload::Block),
            Retrieval::Receipts { hash, .. } => full.receipts(hash).map(Payload::Receipts),
            Retrieval::Account { anchor, address } => full
                .account(&anchor.state_root, address)
                .map(Payload::Account),
            Retrieval::TxStatus { hash } => full.tx_status(hash).map(|proof| {
                Payload::TxStatus(TxStatusRecord {
                    transaction: proof.transaction,
                    block_hash: proof.block_hash,
                    block_number: proof.block_number,
                    index: proof.index,
                })
            }),
            Retrieval::Call {
                anchor,
                address,
                input,
            } => full.call(anchor, address, input).map(Payload::Call),
        };
        payload.ok_or(OdrError::Exhausted)
    }

    async fn drive(self: Arc<Self>, retrieval: Retrieval, key: RequestKey) {
        let started = Instant::now();
        let mut events = self.peers.subscribe();
        let mut tried: HashSet<PeerId> = HashSet::new();

        let result = loop {
            if self.all_waiters_gone(&key) {
                tracing::trace!(kind = retrieval.kind_name(), "all waiters cancelled, aborting");
                return;
            }
            let elapsed = started.elapsed();
            if elapsed >= self.config.request_deadline {
                break Err(OdrError::TimedOut);
            }
            if tried.len() >= self.config.max_attempts {
                break Err(OdrError::Exhausted);
            }
            let Some(peer) = self.select_peer(&retrieval, &tried) else {
                break Err(OdrError::Exhausted);
            };
            tried.insert(peer.id().clone());
            let budget = self
                .config
                .dispatch_timeout
                .min(self.config.request_deadline - elapsed);

            tracing::trace!(
                kind = retrieval.kind_name(),
                peer = %peer.id(),
                "dispatching retrieval"
            );
            let outcome = tokio::select! {
                timed = tokio::time::timeout(budget, dispatch(&peer, &retrieval, &self.chain)) => {
                    match timed {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::debug!(peer = %peer.id(), "retrieval dispatch timed out");
                            continue;
                        }
                    }
                }
                // A peer unregistered mid-flight is retried immediately
                // instead of waiting out the deadline.
                _ = unregistered(&mut events, peer.id()) => Outcome::Unavailable,
            };

            match outcome {
                Outcome::Valid(payload) => break Ok(payload),
                Outcome::Missing => continue,
                Outcome::Unavailable => {
                    tracing::debug!(peer = %peer.id(), "peer unavailable, retrying elsewhere");
                    continue;
                }
                Outcome::Invalid => {
                    self.penalize(peer.id(), &retrieval);
                    continue;
                }
            }
        };

        self.settle(&key, result);
    }

    /// Prune closed waiters; `true` when none remain (the request can be
    /// abandoned).
    fn all_waiters_gone(&self, key: &RequestKey) -> bool {
        let mut state = self.state.lock().expect("odr state lock poisoned");
        match state.pending.get_mut(key) {
            Some(waiters) => {
                waiters.retain(|w| !w.is_closed());
                if waiters.is_empty() {
                    state.pending.remove(key);
                    true
                } else {
                    false
                }
            }
            None => true,
        }
    }

    /// Pick the next untried, unblacklisted peer, preferring peers that
    /// advertise the target block. Deterministic order keeps retries
    /// reproducible.
    fn select_peer(&self, retrieval: &Retrieval, tried: &HashSet<PeerId>) -> Option<Arc<PeerHandle>> {
        let blacklist = {
            let state = self.state.lock().expect("odr state lock poisoned");
            state.blacklist.clone()
        };
        let mut candidates: Vec<Arc<PeerHandle>> = self
            .peers
            .snapshot()
            .into_iter()
            .filter(|p| !tried.contains(p.id()) && !blacklist.contains(p.id()))
            .collect();
        candidates.sort_by_key(|p| {
            let advertises = match retrieval.target_number() {
                Some(number) => p.has_block(number, true),
                None => p.head().is_some(),
            };
            (std::cmp::Reverse(advertises), p.id().clone())
        });
        candidates.into_iter().next()
    }

    /// Blacklist a peer that served an invalid proof and tell subscribers.
    fn penalize(&self, peer: &PeerId, retrieval: &Retrieval) {
        tracing::warn!(
            peer = %peer,
            kind = retrieval.kind_name(),
            "peer returned invalid proof, excluding for session"
        );
        let mut state = self.state.lock().expect("odr state lock poisoned");
        state.blacklist.insert(peer.clone());
        state
            .violation_subs
            .retain(|sub| sub.send(peer.clone()).is_ok());
    }

    /// Deliver the result to every waiter. Cache insertion and delivery
    /// happen under one lock, so no waiter can observe a miss after another
    /// observed a hit.
    fn settle(&self, key: &RequestKey, result: Result<Payload, OdrError>) {
        let mut state = self.state.lock().expect("odr state lock poisoned");
        if let Ok(payload) = &result {
            state.cache.insert(key.clone(), payload.clone());
        }
        if let Some(waiters) = state.pending.remove(key) {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
    }
}

/// Resolve once `id` is unregistered from the peer set. Pends forever if
/// the event stream ends, leaving the dispatch timeout in charge.
async fn unregistered(events: &mut mpsc::UnboundedReceiver<PeerEvent>, id: &PeerId) {
    loop {
        match events.recv().await {
            Some(PeerEvent::Unregistered(gone)) if &gone == id => return,
            Some(_) => continue,
            None => std::future::pending::<()>().await,
        }
    }
}
