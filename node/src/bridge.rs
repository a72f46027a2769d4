//! Peer lifecycle bridge: fans peer-set events out to the fetcher and
//! turns protocol violations into disconnects.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use wisp_fetcher::HeadFetcher;
use wisp_net::{Announcement, PeerEvent, PeerSet};
use wisp_types::PeerId;

use crate::metrics::NodeMetrics;

/// Wires the peer set to the head fetcher and the retrieval engine's
/// violation reports. Registration makes a peer an announcement source;
/// unregistration drops its announcement set. A peer caught misbehaving
/// (weight regression, invalid proof) is unregistered on the spot.
pub struct LifecycleBridge {
    peers: Arc<PeerSet>,
    fetcher: Arc<HeadFetcher>,
    metrics: Arc<NodeMetrics>,
}

impl LifecycleBridge {
    pub fn new(peers: Arc<PeerSet>, fetcher: Arc<HeadFetcher>, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            peers,
            fetcher,
            metrics,
        }
    }

    /// Spawn the pump forwarding peer lifecycle events into the fetcher.
    /// Ends when the peer set is dropped.
    pub fn spawn_event_pump(&self) -> JoinHandle<()> {
        let mut events = self.peers.subscribe();
        let peers = Arc::clone(&self.peers);
        let fetcher = Arc::clone(&self.fetcher);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PeerEvent::Registered(peer) => fetcher.register_peer(peer.id()),
                    PeerEvent::Unregistered(id) => fetcher.remove_peer(&id),
                }
                metrics.peer_count.set(peers.len() as i64);
            }
        })
    }

    /// Spawn the pump dropping peers the retrieval engine flags for serving
    /// invalid proofs.
    pub fn spawn_violation_pump(
        &self,
        mut violations: mpsc::UnboundedReceiver<PeerId>,
    ) -> JoinHandle<()> {
        let peers = Arc::clone(&self.peers);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            while let Some(id) = violations.recv().await {
                metrics.protocol_violations.inc();
                // Already-gone peers are fine; the blacklist covers them.
                if peers.unregister(&id).is_ok() {
                    tracing::warn!(peer = %id, "dropped peer after invalid proof");
                }
            }
        })
    }

    /// Feed one head announcement from a peer into the fetcher. A weight
    /// regression is a protocol violation: the peer is unregistered and its
    /// announcement set discarded.
    pub fn handle_announcement(&self, peer: &PeerId, announcement: &Announcement) {
        let Some(handle) = self.peers.get(peer) else {
            tracing::debug!(peer = %peer, "announcement from unregistered peer ignored");
            return;
        };
        handle.record_head(announcement);
        match self.fetcher.record_announcement(peer, announcement) {
            Ok(()) => {
                self.metrics.announcements_received.inc();
                self.metrics.tree_nodes.set(self.fetcher.node_count() as i64);
            }
            Err(violation) => {
                self.metrics.protocol_violations.inc();
                tracing::warn!(peer = %peer, %violation, "dropped peer after announcement violation");
                let _ = self.peers.unregister(peer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_fetcher::TrustConfig;
    use wisp_net::PeerHandle;
    use wisp_types::{Hash, Weight};

    fn ann(hash_byte: u8, number: u64, weight: u128, parent_byte: u8) -> Announcement {
        Announcement {
            hash: Hash::new([hash_byte; 32]),
            number,
            weight: Weight::new(weight),
            parent_hash: Hash::new([parent_byte; 32]),
        }
    }

    fn peer(id: &str) -> Arc<PeerHandle> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(PeerHandle::new(PeerId::from(id), false, tx))
    }

    fn bridge_with_trust(trust: TrustConfig) -> (LifecycleBridge, Arc<PeerSet>, Arc<HeadFetcher>) {
        let peers = Arc::new(PeerSet::new());
        let fetcher = Arc::new(HeadFetcher::new(trust, 64));
        let metrics = Arc::new(NodeMetrics::new());
        let bridge = LifecycleBridge::new(Arc::clone(&peers), Arc::clone(&fetcher), metrics);
        (bridge, peers, fetcher)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn registration_flows_into_trust_accounting() {
        let trust = TrustConfig::new(["p1", "p2"].map(PeerId::from), 100);
        let (bridge, peers, fetcher) = bridge_with_trust(trust);
        bridge.spawn_event_pump();

        peers.register(peer("p1")).expect("register p1");
        peers.register(peer("p2")).expect("register p2");
        settle().await;

        // One of two trusted confirmations misses the 100% threshold.
        bridge.handle_announcement(&PeerId::from("p1"), &ann(1, 1, 1, 0));
        assert_eq!(fetcher.find_best_request(0), None);

        // With p2 gone the fraction is 1/1.
        peers.unregister(&PeerId::from("p2")).expect("unregister");
        settle().await;
        assert!(fetcher.find_best_request(0).is_some());
    }

    #[tokio::test]
    async fn weight_regression_drops_the_peer() {
        let (bridge, peers, _fetcher) = bridge_with_trust(TrustConfig::none());
        bridge.spawn_event_pump();
        peers.register(peer("p1")).expect("register");
        settle().await;

        bridge.handle_announcement(&PeerId::from("p1"), &ann(2, 2, 5, 1));
        assert!(peers.contains(&PeerId::from("p1")));

        // Announcing a lighter head than before is a violation.
        bridge.handle_announcement(&PeerId::from("p1"), &ann(3, 3, 4, 2));
        assert!(!peers.contains(&PeerId::from("p1")));
    }

    #[tokio::test]
    async fn violation_report_unregisters_the_peer() {
        let (bridge, peers, _fetcher) = bridge_with_trust(TrustConfig::none());
        let (report, violations) = mpsc::unbounded_channel();
        bridge.spawn_violation_pump(violations);

        peers.register(peer("bad")).expect("register");
        report.send(PeerId::from("bad")).expect("report");
        settle().await;

        assert!(!peers.contains(&PeerId::from("bad")));
    }

    #[tokio::test]
    async fn announcement_from_unknown_peer_is_ignored() {
        let (bridge, _peers, fetcher) = bridge_with_trust(TrustConfig::none());
        bridge.handle_announcement(&PeerId::from("ghost"), &ann(1, 1, 1, 0));
        assert_eq!(fetcher.node_count(), 0);
    }
}
