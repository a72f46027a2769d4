//! Prometheus metrics for the wisp node.
//!
//! Covers announcement intake, header synchronization, and on-demand
//! retrieval activity.  The [`NodeMetrics`] struct owns a dedicated
//! [`Registry`] that a scrape endpoint can encode into the Prometheus text
//! exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total head announcements accepted from peers.
    pub announcements_received: IntCounter,
    /// Total headers inserted into the local chain by the sync driver.
    pub headers_inserted: IntCounter,
    /// Total retrievals that went out to the network.
    pub retrievals_dispatched: IntCounter,
    /// Total retrievals answered from the session cache.
    pub retrievals_cached: IntCounter,
    /// Total retrievals that ended in exhaustion or timeout.
    pub retrievals_failed: IntCounter,
    /// Total protocol violations (weight regressions, invalid proofs).
    pub protocol_violations: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of registered peers.
    pub peer_count: IntGauge,
    /// Current number of in-flight retrievals.
    pub pending_retrievals: IntGauge,
    /// Current number of nodes across all announcement trees.
    pub tree_nodes: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let announcements_received = register_int_counter_with_registry!(
            Opts::new(
                "wisp_announcements_received_total",
                "Total head announcements accepted from peers"
            ),
            registry
        )
        .expect("failed to register announcements_received counter");

        let headers_inserted = register_int_counter_with_registry!(
            Opts::new(
                "wisp_headers_inserted_total",
                "Total headers inserted by the sync driver"
            ),
            registry
        )
        .expect("failed to register headers_inserted counter");

        let retrievals_dispatched = register_int_counter_with_registry!(
            Opts::new(
                "wisp_retrievals_dispatched_total",
                "Total retrievals dispatched to the network"
            ),
            registry
        )
        .expect("failed to register retrievals_dispatched counter");

        let retrievals_cached = register_int_counter_with_registry!(
            Opts::new(
                "wisp_retrievals_cached_total",
                "Total retrievals answered from the session cache"
            ),
            registry
        )
        .expect("failed to register retrievals_cached counter");

        let retrievals_failed = register_int_counter_with_registry!(
            Opts::new(
                "wisp_retrievals_failed_total",
                "Total retrievals that exhausted peers or timed out"
            ),
            registry
        )
        .expect("failed to register retrievals_failed counter");

        let protocol_violations = register_int_counter_with_registry!(
            Opts::new(
                "wisp_protocol_violations_total",
                "Total protocol violations observed"
            ),
            registry
        )
        .expect("failed to register protocol_violations counter");

        let peer_count = register_int_gauge_with_registry!(
            Opts::new("wisp_peer_count", "Current number of registered peers"),
            registry
        )
        .expect("failed to register peer_count gauge");

        let pending_retrievals = register_int_gauge_with_registry!(
            Opts::new(
                "wisp_pending_retrievals",
                "Current number of in-flight retrievals"
            ),
            registry
        )
        .expect("failed to register pending_retrievals gauge");

        let tree_nodes = register_int_gauge_with_registry!(
            Opts::new(
                "wisp_tree_nodes",
                "Current number of announcement tree nodes"
            ),
            registry
        )
        .expect("failed to register tree_nodes gauge");

        Self {
            registry,
            announcements_received,
            headers_inserted,
            retrievals_dispatched,
            retrievals_cached,
            retrievals_failed,
            protocol_violations,
            peer_count,
            pending_retrievals,
            tree_nodes,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = NodeMetrics::new();
        assert_eq!(metrics.announcements_received.get(), 0);
        metrics.announcements_received.inc();
        assert_eq!(metrics.announcements_received.get(), 1);
    }

    #[test]
    fn all_metrics_register_under_one_registry() {
        let metrics = NodeMetrics::new();
        assert_eq!(metrics.registry.gather().len(), 9);
    }
}
