//! Best-head selection across all peers' announcement trees.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Mutex;

use wisp_net::Announcement;
use wisp_types::{Hash, PeerId, Weight};

use crate::error::FetchError;
use crate::tree::AnnouncementTree;
use crate::trust::TrustConfig;

/// Whether reconnecting to a selected head needs a full resynchronization
/// pass or an incremental single-segment fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Incremental,
    FullResync,
}

/// The head candidate the sync driver should request next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestRequest {
    pub hash: Hash,
    pub number: u64,
    pub weight: Weight,
    /// Headers to fetch to connect the candidate to the current head: the
    /// height distance, but never less than the recorded fork segment
    /// leading up to the candidate.
    pub batch_size: u64,
    pub mode: SyncMode,
    /// Peers confirming the candidate, sorted for determinism.
    pub confirmed_by: Vec<PeerId>,
}

/// Aggregates per-peer announcement trees and selects the best head to
/// request. All tree state sits behind one coarse lock; announcement
/// handling never suspends and selection takes a consistent snapshot.
pub struct HeadFetcher {
    tree: Mutex<AnnouncementTree>,
    trust: TrustConfig,
    /// Chain distance beyond which a candidate requires a full resync.
    resync_threshold: u64,
}

impl HeadFetcher {
    pub fn new(trust: TrustConfig, resync_threshold: u64) -> Self {
        Self {
            tree: Mutex::new(AnnouncementTree::new()),
            trust,
            resync_threshold,
        }
    }

    pub fn trust(&self) -> &TrustConfig {
        &self.trust
    }

    /// Make a peer known as a candidate source.
    pub fn register_peer(&self, peer: &PeerId) {
        let mut tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.register_peer(peer);
    }

    /// Drop a peer's announcement set and trust accounting.
    pub fn remove_peer(&self, peer: &PeerId) {
        let mut tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.remove_peer(peer);
    }

    /// Record a head announcement. A violation means the peer broke the
    /// protocol and should be considered for dropping by the caller.
    pub fn record_announcement(
        &self,
        peer: &PeerId,
        announcement: &Announcement,
    ) -> Result<(), FetchError> {
        let mut tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.record(peer, announcement)?;
        tracing::trace!(
            peer = %peer,
            head = %announcement.hash,
            weight = %announcement.weight,
            "recorded head announcement"
        );
        Ok(())
    }

    /// Raise the confirmed-weight floor after verified headers were
    /// inserted, pruning candidates the chain has already passed.
    pub fn advance_confirmed(&self, weight: Weight) {
        let mut tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.advance_confirmed(weight);
    }

    pub fn max_confirmed(&self) -> Weight {
        let tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.max_confirmed()
    }

    pub fn node_count(&self) -> usize {
        let tree = self.tree.lock().expect("fetcher lock poisoned");
        tree.node_count()
    }

    /// Select the best eligible head candidate, or `None` when nothing
    /// better than the confirmed chain is available (hold position).
    ///
    /// Eligibility: with trusted peers configured, a candidate needs at
    /// least one trusted confirmation and the trusted-confirmation fraction
    /// must reach the configured threshold (equality counts); with no
    /// trusted peers configured, any single confirmation suffices. Ties on
    /// weight break toward more confirming peers, then the smaller hash, so
    /// the result is independent of peer iteration order.
    pub fn find_best_request(&self, head_number: u64) -> Option<BestRequest> {
        let tree = self.tree.lock().expect("fetcher lock poisoned");

        let confirmations: Vec<(PeerId, HashSet<Hash>)> = tree
            .peers()
            .map(|p| (p.clone(), tree.confirmed_by(p)))
            .collect();
        let total_trusted = confirmations
            .iter()
            .filter(|(p, _)| self.trust.is_trusted(p))
            .count();

        let mut best: Option<(Weight, usize, Hash, u64, Vec<PeerId>)> = None;
        for node in tree.candidates() {
            let confirming: Vec<&PeerId> = confirmations
                .iter()
                .filter(|(_, confirmed)| confirmed.contains(&node.hash))
                .map(|(p, _)| p)
                .collect();
            if confirming.is_empty() {
                continue;
            }

            let eligible = if self.trust.has_trusted() {
                let trusted_confirming = confirming
                    .iter()
                    .filter(|p| self.trust.is_trusted(p))
                    .count();
                trusted_confirming > 0
                    && total_trusted > 0
                    && trusted_confirming * 100
                        >= self.trust.required_fraction() as usize * total_trusted
            } else {
                true
            };
            if !eligible {
                continue;
            }

            let key = (node.weight, confirming.len(), Reverse(node.hash));
            let better = match &best {
                None => true,
                Some((w, count, hash, _, _)) => key > (*w, *count, Reverse(*hash)),
            };
            if better {
                best = Some((
                    node.weight,
                    confirming.len(),
                    node.hash,
                    node.number,
                    confirming.iter().map(|p| (*p).clone()).collect(),
                ));
            }
        }

        let (weight, _, hash, number, mut confirmed_by) = best?;
        confirmed_by.sort();
        // A side fork at or below the local height still needs its whole
        // recorded segment fetched, not just the height difference.
        let batch_size = number
            .saturating_sub(head_number)
            .max(tree.segment_len(&hash))
            .max(1);
        let mode = if batch_size > self.resync_threshold {
            SyncMode::FullResync
        } else {
            SyncMode::Incremental
        };
        Some(BestRequest {
            hash,
            number,
            weight,
            batch_size,
            mode,
            confirmed_by,
        })
    }
}
