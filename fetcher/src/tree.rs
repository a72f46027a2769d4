//! Per-peer announcement trees over a shared node arena.
//!
//! Nodes are addressed by hash and hold their parent as a hash lookup, not a
//! memory link, so segments announced by different peers share structure
//! without ownership cycles. Nodes are immutable once inserted; pruning
//! drops whole entries from the arena and stale hashes left in peer sets are
//! filtered on next access.

use std::collections::{HashMap, HashSet};

use wisp_types::{Hash, PeerId, Weight};

use wisp_net::Announcement;

use crate::error::FetchError;

/// One head candidate. `weight` is the cumulative weight the announcing
/// peer claims for the chain ending at `hash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub hash: Hash,
    pub number: u64,
    pub weight: Weight,
    /// Parent node by hash, or `None` for an orphan segment whose parent
    /// has not been announced.
    pub parent: Option<Hash>,
}

/// The forest of announced head candidates plus the per-peer confirmation
/// relation.
#[derive(Default)]
pub struct AnnouncementTree {
    /// Arena of candidate nodes keyed by hash.
    nodes: HashMap<Hash, TreeNode>,
    /// Heads each peer announced directly. May contain hashes already
    /// pruned from the arena; those are skipped on access.
    announced: HashMap<PeerId, HashSet<Hash>>,
    /// Highest weight each peer has announced, for regression detection.
    last_weight: HashMap<PeerId, Weight>,
    /// Pruning floor: cumulative weight already confirmed locally.
    max_confirmed: Weight,
}

impl AnnouncementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a peer known as an announcement source (with an empty set).
    pub fn register_peer(&mut self, peer: &PeerId) {
        self.announced.entry(peer.clone()).or_default();
    }

    /// Forget a peer's announcement set and regression state. Its nodes stay
    /// in the arena while other peers still reference them; unreferenced
    /// nodes at or below the pruning floor are already gone.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.announced.remove(peer);
        self.last_weight.remove(peer);
    }

    /// Record a head announcement from a peer.
    ///
    /// Inserts or reuses the node for the announced hash (orphan segments
    /// allowed) and adds it to the peer's set; a duplicate announcement is a
    /// no-op. Announcing a weight below the peer's own previous announcement
    /// or at/below a known parent's weight is a protocol violation.
    pub fn record(&mut self, peer: &PeerId, announcement: &Announcement) -> Result<(), FetchError> {
        if let Some(previous) = self.last_weight.get(peer) {
            if announcement.weight < *previous {
                return Err(FetchError::WeightRegression {
                    peer: peer.clone(),
                    previous: *previous,
                    announced: announcement.weight,
                });
            }
        }

        if !self.nodes.contains_key(&announcement.hash)
            && announcement.weight > self.max_confirmed
        {
            let parent = match self.nodes.get(&announcement.parent_hash) {
                Some(parent_node) => {
                    if announcement.weight <= parent_node.weight {
                        return Err(FetchError::NonMonotonicWeight {
                            hash: announcement.hash,
                            weight: announcement.weight,
                            parent_weight: parent_node.weight,
                        });
                    }
                    Some(announcement.parent_hash)
                }
                None => None,
            };
            self.nodes.insert(
                announcement.hash,
                TreeNode {
                    hash: announcement.hash,
                    number: announcement.number,
                    weight: announcement.weight,
                    parent,
                },
            );
        }

        self.announced
            .entry(peer.clone())
            .or_default()
            .insert(announcement.hash);
        self.last_weight.insert(peer.clone(), announcement.weight);
        Ok(())
    }

    /// Raise the pruning floor and drop every node at or below it. The floor
    /// never goes down.
    pub fn advance_confirmed(&mut self, weight: Weight) {
        if weight <= self.max_confirmed {
            return;
        }
        self.max_confirmed = weight;
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.weight > weight);
        let pruned = before - self.nodes.len();
        if pruned > 0 {
            tracing::debug!(pruned, floor = %weight, "pruned confirmed head candidates");
        }
    }

    pub fn max_confirmed(&self) -> Weight {
        self.max_confirmed
    }

    pub fn node(&self, hash: &Hash) -> Option<&TreeNode> {
        self.nodes.get(hash)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the recorded segment ending at `hash`: the node itself
    /// plus every ancestor reachable through parent links. Zero for an
    /// unknown hash.
    pub fn segment_len(&self, hash: &Hash) -> u64 {
        let mut len = 0;
        let mut cursor = *hash;
        while let Some(node) = self.nodes.get(&cursor) {
            len += 1;
            match node.parent {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        len
    }

    /// Registered announcement-source peers.
    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.announced.keys()
    }

    /// Candidate nodes above the pruning floor.
    pub fn candidates(&self) -> impl Iterator<Item = &TreeNode> {
        let floor = self.max_confirmed;
        self.nodes.values().filter(move |n| n.weight > floor)
    }

    /// All hashes a peer confirms: its direct announcements plus every
    /// ancestor reachable through parent links (confirming a descendant
    /// implies confirming each ancestor). Stale hashes are skipped.
    pub fn confirmed_by(&self, peer: &PeerId) -> HashSet<Hash> {
        let mut confirmed = HashSet::new();
        let Some(heads) = self.announced.get(peer) else {
            return confirmed;
        };
        for head in heads {
            let mut cursor = *head;
            while let Some(node) = self.nodes.get(&cursor) {
                if !confirmed.insert(cursor) {
                    break;
                }
                match node.parent {
                    Some(parent) => cursor = parent,
                    None => break,
                }
            }
        }
        confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(hash_byte: u8, number: u64, weight: u128, parent_byte: u8) -> Announcement {
        Announcement {
            hash: Hash::new([hash_byte; 32]),
            number,
            weight: Weight::new(weight),
            parent_hash: Hash::new([parent_byte; 32]),
        }
    }

    fn peer(id: &str) -> PeerId {
        PeerId::from(id)
    }

    #[test]
    fn record_builds_linked_segment() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p, &ann(2, 2, 2, 1)).expect("record");

        let node = tree.node(&Hash::new([2; 32])).expect("node");
        assert_eq!(node.parent, Some(Hash::new([1; 32])));
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn unknown_parent_creates_orphan() {
        let mut tree = AnnouncementTree::new();
        tree.record(&peer("p1"), &ann(5, 9, 9, 4)).expect("record");
        assert_eq!(tree.node(&Hash::new([5; 32])).expect("node").parent, None);
    }

    #[test]
    fn duplicate_announcement_is_noop() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p, &ann(1, 1, 1, 0)).expect("duplicate ok");
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn weight_regression_is_violation() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(2, 2, 5, 1)).expect("record");
        let err = tree.record(&p, &ann(3, 3, 4, 2)).unwrap_err();
        assert!(matches!(err, FetchError::WeightRegression { .. }));
    }

    #[test]
    fn non_monotonic_child_is_violation() {
        let mut tree = AnnouncementTree::new();
        tree.record(&peer("p1"), &ann(1, 1, 5, 0)).expect("record");
        // Different peer, so no regression check — but the parent link fails.
        let err = tree.record(&peer("p2"), &ann(2, 2, 5, 1)).unwrap_err();
        assert!(matches!(err, FetchError::NonMonotonicWeight { .. }));
    }

    #[test]
    fn segment_len_counts_recorded_ancestors() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p, &ann(2, 2, 2, 1)).expect("record");
        tree.record(&p, &ann(9, 9, 9, 8)).expect("orphan");

        assert_eq!(tree.segment_len(&Hash::new([2; 32])), 2);
        assert_eq!(tree.segment_len(&Hash::new([9; 32])), 1);
        assert_eq!(tree.segment_len(&Hash::new([7; 32])), 0);
    }

    #[test]
    fn descendant_confirms_ancestors() {
        let mut tree = AnnouncementTree::new();
        let p1 = peer("p1");
        let p2 = peer("p2");
        tree.record(&p1, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p1, &ann(2, 2, 2, 1)).expect("record");
        // p2 only announces the tip but confirms the whole segment.
        tree.record(&p2, &ann(3, 3, 3, 2)).expect("record");

        let confirmed = tree.confirmed_by(&p2);
        assert!(confirmed.contains(&Hash::new([3; 32])));
        assert!(confirmed.contains(&Hash::new([2; 32])));
        assert!(confirmed.contains(&Hash::new([1; 32])));
    }

    #[test]
    fn pruning_drops_nodes_at_or_below_floor() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p, &ann(2, 2, 2, 1)).expect("record");
        tree.record(&p, &ann(3, 3, 3, 2)).expect("record");

        tree.advance_confirmed(Weight::new(2));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.node(&Hash::new([3; 32])).is_some());
        assert_eq!(tree.candidates().count(), 1);

        // Floor never regresses.
        tree.advance_confirmed(Weight::new(1));
        assert_eq!(tree.max_confirmed(), Weight::new(2));
    }

    #[test]
    fn reannounced_pruned_node_stays_out() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.record(&p, &ann(2, 2, 2, 1)).expect("record");
        tree.advance_confirmed(Weight::new(2));
        assert_eq!(tree.node_count(), 0);

        tree.record(&p, &ann(2, 2, 2, 1)).expect("reannounce ok");
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.candidates().count(), 0);
    }

    #[test]
    fn removed_peer_keeps_shared_nodes() {
        let mut tree = AnnouncementTree::new();
        let p1 = peer("p1");
        let p2 = peer("p2");
        tree.record(&p1, &ann(1, 1, 1, 0)).expect("record");
        tree.record(&p2, &ann(1, 1, 1, 0)).expect("record");

        tree.remove_peer(&p1);
        assert!(tree.node(&Hash::new([1; 32])).is_some());
        assert!(tree.confirmed_by(&p1).is_empty());
        assert!(!tree.confirmed_by(&p2).is_empty());
    }

    #[test]
    fn empty_set_peer_is_retained() {
        let mut tree = AnnouncementTree::new();
        let p = peer("p1");
        tree.register_peer(&p);
        assert_eq!(tree.peers().count(), 1);
        assert!(tree.confirmed_by(&p).is_empty());
    }
}
