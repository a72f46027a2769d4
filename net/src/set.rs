//! Registered peer set with lifecycle event fan-out.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use wisp_types::PeerId;

use crate::error::NetError;
use crate::peer::PeerHandle;

/// Lifecycle event delivered to subscribers when the peer set changes.
#[derive(Clone)]
pub enum PeerEvent {
    Registered(Arc<PeerHandle>),
    Unregistered(PeerId),
}

struct SetInner {
    peers: HashMap<PeerId, Arc<PeerHandle>>,
    subscribers: Vec<mpsc::UnboundedSender<PeerEvent>>,
}

/// All currently registered peers. Registration makes a peer eligible as an
/// ODR target and as an announcement source; events fan out to every
/// subscriber (fetcher, ODR engine) in registration order.
pub struct PeerSet {
    inner: RwLock<SetInner>,
}

impl Default for PeerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerSet {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SetInner {
                peers: HashMap::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Subscribe to lifecycle events. Events for peers registered before the
    /// subscription are not replayed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PeerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().expect("peer set lock poisoned");
        inner.subscribers.push(tx);
        rx
    }

    pub fn register(&self, peer: Arc<PeerHandle>) -> Result<(), NetError> {
        let mut inner = self.inner.write().expect("peer set lock poisoned");
        let id = peer.id().clone();
        if inner.peers.contains_key(&id) {
            return Err(NetError::AlreadyRegistered(id));
        }
        inner.peers.insert(id.clone(), Arc::clone(&peer));
        tracing::debug!(peer = %id, trusted = peer.is_trusted(), "peer registered");
        Self::notify(&mut inner, PeerEvent::Registered(peer));
        Ok(())
    }

    pub fn unregister(&self, id: &PeerId) -> Result<Arc<PeerHandle>, NetError> {
        let mut inner = self.inner.write().expect("peer set lock poisoned");
        let Some(peer) = inner.peers.remove(id) else {
            return Err(NetError::UnknownPeer(id.clone()));
        };
        tracing::debug!(peer = %id, "peer unregistered");
        Self::notify(&mut inner, PeerEvent::Unregistered(id.clone()));
        Ok(peer)
    }

    fn notify(inner: &mut SetInner, event: PeerEvent) {
        inner
            .subscribers
            .retain(|sub| sub.send(event.clone()).is_ok());
    }

    pub fn get(&self, id: &PeerId) -> Option<Arc<PeerHandle>> {
        let inner = self.inner.read().expect("peer set lock poisoned");
        inner.peers.get(id).cloned()
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        let inner = self.inner.read().expect("peer set lock poisoned");
        inner.peers.contains_key(id)
    }

    /// Snapshot of all registered peers, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<PeerHandle>> {
        let inner = self.inner.read().expect("peer set lock poisoned");
        inner.peers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("peer set lock poisoned");
        inner.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc as tokio_mpsc;

    fn peer(id: &str) -> Arc<PeerHandle> {
        let (tx, _rx) = tokio_mpsc::channel(1);
        Arc::new(PeerHandle::new(PeerId::from(id), false, tx))
    }

    #[test]
    fn register_and_unregister() {
        let set = PeerSet::new();
        set.register(peer("a")).expect("register");
        assert_eq!(set.len(), 1);
        assert!(set.contains(&PeerId::from("a")));

        set.unregister(&PeerId::from("a")).expect("unregister");
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let set = PeerSet::new();
        set.register(peer("a")).expect("register");
        let err = set.register(peer("a")).unwrap_err();
        assert_eq!(err, NetError::AlreadyRegistered(PeerId::from("a")));
    }

    #[test]
    fn unknown_unregister_rejected() {
        let set = PeerSet::new();
        let err = set.unregister(&PeerId::from("ghost")).unwrap_err();
        assert_eq!(err, NetError::UnknownPeer(PeerId::from("ghost")));
    }

    #[test]
    fn subscribers_see_lifecycle_events() {
        let set = PeerSet::new();
        let mut events = set.subscribe();

        set.register(peer("a")).expect("register");
        set.unregister(&PeerId::from("a")).expect("unregister");

        match events.try_recv().expect("registered event") {
            PeerEvent::Registered(p) => assert_eq!(p.id(), &PeerId::from("a")),
            PeerEvent::Unregistered(_) => panic!("expected Registered first"),
        }
        match events.try_recv().expect("unregistered event") {
            PeerEvent::Unregistered(id) => assert_eq!(id, PeerId::from("a")),
            PeerEvent::Registered(_) => panic!("expected Unregistered second"),
        }
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let set = PeerSet::new();
        let events = set.subscribe();
        drop(events);
        // Next notification drops the dead subscriber instead of erroring.
        set.register(peer("a")).expect("register");
        assert_eq!(set.len(), 1);
    }
}
