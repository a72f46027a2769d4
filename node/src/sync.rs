//! Header sync driver: turns the fetcher's best candidate into chain
//! growth.

use std::sync::Arc;

use wisp_chain::{ChainError, HeaderChain};
use wisp_fetcher::{HeadFetcher, SyncMode};
use wisp_net::PeerSet;
use wisp_types::{Hash, Header};

use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// What one completed sync round did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub target: Hash,
    pub inserted: usize,
    pub mode: SyncMode,
}

/// Drives one fetch-verify-insert round at a time. Selection comes from the
/// fetcher, headers from a confirming peer, insertion goes through the
/// chain's exclusive lock. Insertion errors surface unmodified; the driver
/// never retries a failed batch.
pub struct SyncDriver {
    chain: Arc<HeaderChain>,
    peers: Arc<PeerSet>,
    fetcher: Arc<HeadFetcher>,
    metrics: Arc<NodeMetrics>,
}

impl SyncDriver {
    pub fn new(
        chain: Arc<HeaderChain>,
        peers: Arc<PeerSet>,
        fetcher: Arc<HeadFetcher>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            chain,
            peers,
            fetcher,
            metrics,
        }
    }

    /// Run one sync round. `Ok(None)` means no eligible candidate exists
    /// and the chain holds position.
    pub async fn sync_once(&self) -> Result<Option<SyncReport>, NodeError> {
        let head = self.chain.head();
        let Some(best) = self.fetcher.find_best_request(head.number) else {
            return Ok(None);
        };
        let serving = best
            .confirmed_by
            .iter()
            .find_map(|id| self.peers.get(id))
            .ok_or(NodeError::NoServingPeer)?;

        // A full resync refetches everything above genesis; an incremental
        // round only needs the connecting segment.
        let count = match best.mode {
            SyncMode::Incremental => best.batch_size,
            SyncMode::FullResync => best.number,
        };
        tracing::info!(
            target = %best.hash,
            number = best.number,
            batch = count,
            mode = ?best.mode,
            peer = %serving.id(),
            "sync round starting"
        );

        let headers = serving.request_headers(best.hash, count).await?;
        verify_linked(&headers, best.hash)?;

        let inserted = match self.chain.insert_header_chain(&headers, 0) {
            // A side fork whose announced segment stops short of a locally
            // known ancestor cannot connect from the short batch; refetch
            // the candidate's full range instead.
            Err(ChainError::UnknownParent { .. }) if count < best.number => {
                tracing::debug!(
                    target = %best.hash,
                    short = count,
                    full = best.number,
                    "batch does not connect locally, refetching full range"
                );
                let headers = serving.request_headers(best.hash, best.number).await?;
                verify_linked(&headers, best.hash)?;
                self.chain.insert_header_chain(&headers, 0)?
            }
            other => other?,
        };
        self.fetcher.advance_confirmed(best.weight);
        self.metrics.headers_inserted.inc_by(inserted as u64);
        self.metrics.tree_nodes.set(self.fetcher.node_count() as i64);

        let new_head = self.chain.head();
        tracing::info!(
            head = %new_head.hash,
            number = new_head.number,
            inserted,
            "sync round complete"
        );
        Ok(Some(SyncReport {
            target: best.hash,
            inserted,
            mode: best.mode,
        }))
    }
}

/// A header batch must end at the requested target and be parent-linked.
fn verify_linked(headers: &[Header], target: Hash) -> Result<(), NodeError> {
    if headers.last().map(|h| h.hash()) != Some(target) {
        return Err(NodeError::DiscontinuousBatch);
    }
    for pair in headers.windows(2) {
        if pair[1].parent_hash != pair[0].hash() {
            return Err(NodeError::DiscontinuousBatch);
        }
    }
    Ok(())
}
