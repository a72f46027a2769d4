//! WISP light node — wires the fetcher, retrieval engine and chain together.
//!
//! The node is the coordinator that:
//! - Tracks registered peers and fans lifecycle events out to the fetcher
//! - Feeds head announcements into per-peer announcement trees
//! - Runs header sync rounds against the best confirmed candidate
//! - Answers on-demand retrievals through the proof-validating engine
//! - Drops peers caught violating the protocol
//! - Gates dependent services on sync activity

pub mod bridge;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod sync;

pub use bridge::LifecycleBridge;
pub use config::NodeConfig;
pub use error::NodeError;
pub use gate::{GateAction, ServiceEvent, ServiceGate, ServiceState};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use sync::{SyncDriver, SyncReport};

use std::sync::Arc;

use wisp_chain::{FullBackend, HeaderChain};
use wisp_fetcher::HeadFetcher;
use wisp_net::{Announcement, PeerHandle, PeerSet};
use wisp_odr::{OdrEngine, OdrError, Payload, Retrieval};
use wisp_types::{Header, PeerId};

/// A running light node: chain, peers, fetcher, retrieval engine, sync
/// driver and service gate assembled from one [`NodeConfig`].
pub struct LightNode {
    chain: Arc<HeaderChain>,
    peers: Arc<PeerSet>,
    fetcher: Arc<HeadFetcher>,
    engine: Arc<OdrEngine>,
    metrics: Arc<NodeMetrics>,
    bridge: LifecycleBridge,
    driver: SyncDriver,
    gate: ServiceGate,
}

impl LightNode {
    /// Build a light node rooted at `genesis`.
    pub fn new(config: &NodeConfig, genesis: Header) -> Self {
        let chain = Arc::new(HeaderChain::new(genesis));
        Self::assemble(config, chain, None)
    }

    /// Build a node with full chain data available: retrievals resolve
    /// locally and never touch the network.
    pub fn with_full_backend(config: &NodeConfig, backend: Arc<FullBackend>) -> Self {
        let chain = Arc::new(HeaderChain::new(backend.genesis_header()));
        Self::assemble(config, chain, Some(backend))
    }

    fn assemble(
        config: &NodeConfig,
        chain: Arc<HeaderChain>,
        full: Option<Arc<FullBackend>>,
    ) -> Self {
        let peers = Arc::new(PeerSet::new());
        let fetcher = Arc::new(HeadFetcher::new(
            config.trust_config(),
            config.resync_threshold,
        ));
        let engine = match full {
            Some(backend) => Arc::new(OdrEngine::with_full_backend(
                backend,
                Arc::clone(&peers),
                config.odr_config(),
            )),
            None => Arc::new(OdrEngine::new(
                Arc::clone(&chain),
                Arc::clone(&peers),
                config.odr_config(),
            )),
        };
        let metrics = Arc::new(NodeMetrics::new());
        let bridge = LifecycleBridge::new(
            Arc::clone(&peers),
            Arc::clone(&fetcher),
            Arc::clone(&metrics),
        );
        let driver = SyncDriver::new(
            Arc::clone(&chain),
            Arc::clone(&peers),
            Arc::clone(&fetcher),
            Arc::clone(&metrics),
        );
        Self {
            chain,
            peers,
            fetcher,
            engine,
            metrics,
            bridge,
            driver,
            gate: ServiceGate::new(),
        }
    }

    /// Start the background pumps (peer events into the fetcher, proof
    /// violations into disconnects). Call once, from within a runtime.
    pub fn start(&self) {
        self.bridge.spawn_event_pump();
        self.bridge.spawn_violation_pump(self.engine.violations());
    }

    pub fn chain(&self) -> &Arc<HeaderChain> {
        &self.chain
    }

    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    pub fn fetcher(&self) -> &Arc<HeadFetcher> {
        &self.fetcher
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn gate(&self) -> &ServiceGate {
        &self.gate
    }

    pub fn register_peer(&self, peer: Arc<PeerHandle>) -> Result<(), NodeError> {
        self.peers.register(peer)?;
        Ok(())
    }

    pub fn unregister_peer(&self, id: &PeerId) -> Result<(), NodeError> {
        self.peers.unregister(id)?;
        Ok(())
    }

    /// Feed one head announcement from a peer. Violations drop the peer.
    pub fn handle_announcement(&self, peer: &PeerId, announcement: &Announcement) {
        self.bridge.handle_announcement(peer, announcement);
    }

    /// Ask the gated service to start; deferred while a sync is running.
    pub fn request_service_start(&self) -> GateAction {
        self.gate.handle(ServiceEvent::StartRequested)
    }

    /// Ask the gated service to stop. Cancels any pending restart.
    pub fn request_service_stop(&self) -> GateAction {
        self.gate.handle(ServiceEvent::StopRequested)
    }

    /// Run one sync round against the best confirmed candidate, feeding the
    /// service gate. Observe [`LightNode::gate`] afterwards for the service
    /// state the round left behind.
    pub async fn sync_once(&self) -> Result<Option<SyncReport>, NodeError> {
        self.gate.handle(ServiceEvent::SyncStarted);
        match self.driver.sync_once().await {
            Ok(report) => {
                self.gate.handle(ServiceEvent::SyncFinished);
                Ok(report)
            }
            Err(err) => {
                self.gate.handle(ServiceEvent::SyncFailed);
                Err(err)
            }
        }
    }

    /// Resolve a retrieval through the engine, with metric accounting.
    pub async fn retrieve(&self, retrieval: Retrieval) -> Result<Payload, OdrError> {
        if let Some(hit) = self.engine.lookup_cached(&retrieval.key()) {
            self.metrics.retrievals_cached.inc();
            return Ok(hit);
        }
        self.metrics.retrievals_dispatched.inc();
        let result = self.engine.retrieve(retrieval).await;
        self.metrics
            .pending_retrievals
            .set(self.engine.pending_count() as i64);
        if result.is_err() {
            self.metrics.retrievals_failed.inc();
        }
        result
    }
}
