//! Per-kind dispatch and proof validation against the anchor header.

use wisp_chain::HeaderChain;
use wisp_net::PeerHandle;
use wisp_types::{execute_call, receipts_root};

use crate::request::{Payload, Retrieval, TxStatusRecord};

/// Outcome of one dispatch attempt against one peer.
#[derive(Debug)]
pub enum Outcome {
    /// Proof validated against the anchor; payload is trustworthy.
    Valid(Payload),
    /// The peer answered but does not have the data.
    Missing,
    /// The peer returned something that fails validation — misbehavior.
    Invalid,
    /// The peer disconnected or its channel is gone; retry elsewhere
    /// immediately.
    Unavailable,
}

/// Send the kind-specific request to `peer` and validate the response
/// against the retrieval's anchor. Never returns an error: every failure
/// mode maps onto an [`Outcome`] the engine retries or penalizes on.
pub async fn dispatch(peer: &PeerHandle, retrieval: &Retrieval, chain: &HeaderChain) -> Outcome {
    match retrieval {
        Retrieval::Block { anchor, hash } => match peer.request_block(*hash).await {
            Err(_) => Outcome::Unavailable,
            Ok(None) => Outcome::Missing,
            Ok(Some(body)) => {
                if body.tx_root() == anchor.tx_root {
                    Outcome::Valid(Payload::Block(body))
                } else {
                    Outcome::Invalid
                }
            }
        },

        Retrieval::Receipts { anchor, hash } => match peer.request_receipts(*hash).await {
            Err(_) => Outcome::Unavailable,
            Ok(None) => Outcome::Missing,
            Ok(Some(receipts)) => {
                if receipts_root(&receipts) == anchor.receipts_root {
                    Outcome::Valid(Payload::Receipts(receipts))
                } else {
                    Outcome::Invalid
                }
            }
        },

        Retrieval::Account { anchor, address } => {
            match peer.request_account_proof(anchor.state_root, *address).await {
                Err(_) => Outcome::Unavailable,
                Ok(None) => Outcome::Missing,
                Ok(Some(proof)) => {
                    let leaf = proof.account.leaf_hash(address);
                    if proof.path.resolve(leaf) == anchor.state_root {
                        Outcome::Valid(Payload::Account(proof.account))
                    } else {
                        Outcome::Invalid
                    }
                }
            }
        }

        Retrieval::TxStatus { hash } => match peer.request_tx_status(*hash).await {
            Err(_) => Outcome::Unavailable,
            Ok(None) => Outcome::Missing,
            Ok(Some(proof)) => {
                if proof.transaction.hash() != *hash {
                    return Outcome::Invalid;
                }
                // The reported block must be locally known; its tx root is
                // the anchor the inclusion path has to reach.
                let Some(header) = chain.get_header(&proof.block_hash) else {
                    return Outcome::Invalid;
                };
                // The path must both reach the tx root and prove the exact
                // position the peer claims for the transaction.
                if header.number != proof.block_number
                    || proof.path.leaf_index() != proof.index
                    || proof.path.resolve(proof.transaction.hash()) != header.tx_root
                {
                    return Outcome::Invalid;
                }
                Outcome::Valid(Payload::TxStatus(TxStatusRecord {
                    transaction: proof.transaction,
                    block_hash: proof.block_hash,
                    block_number: proof.block_number,
                    index: proof.index,
                }))
            }
        },

        Retrieval::Call {
            anchor,
            address,
            input,
        } => {
            match peer.request_account_proof(anchor.state_root, *address).await {
                Err(_) => Outcome::Unavailable,
                Ok(None) => Outcome::Missing,
                Ok(Some(proof)) => {
                    let leaf = proof.account.leaf_hash(address);
                    if proof.path.resolve(leaf) != anchor.state_root {
                        return Outcome::Invalid;
                    }
                    // Light execution over the proven account.
                    Outcome::Valid(Payload::Call(execute_call(&proof.account, input)))
                }
            }
        }
    }
}
