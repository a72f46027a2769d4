//! Typed retrieval requests, their deduplication keys, and verified
//! payloads.
//!
//! The set of kinds is closed on purpose: everything that processes a
//! retrieval matches exhaustively, so adding a kind is a compile-visible
//! change everywhere.

use wisp_types::{Address, Body, Hash, Header, Receipt, Transaction};

/// A retrieval a caller wants answered. The anchor header is already
/// locally trusted and supplies the root the returned proof must validate
/// against.
#[derive(Clone, Debug)]
pub enum Retrieval {
    /// Block body whose transactions are committed by `anchor.tx_root`.
    /// `anchor` is the header with hash `hash`.
    Block { anchor: Header, hash: Hash },
    /// Receipts committed by `anchor.receipts_root`.
    Receipts { anchor: Header, hash: Hash },
    /// Account state proven under `anchor.state_root`.
    Account { anchor: Header, address: Address },
    /// Inclusion and position of a transaction. Validated against the
    /// locally known header of whichever block the peer reports.
    TxStatus { hash: Hash },
    /// Contract-call output computed over the account proven under
    /// `anchor.state_root`. There is no call request on the wire; the
    /// account proof is fetched and the call executes locally.
    Call {
        anchor: Header,
        address: Address,
        input: Vec<u8>,
    },
}

/// Deduplication and cache key: one live request per distinct key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestKey {
    Block(Hash),
    Receipts(Hash),
    Account(Hash, Address),
    TxStatus(Hash),
    /// State root, callee address, and digest of the call input.
    Call(Hash, Address, Hash),
}

impl Retrieval {
    pub fn key(&self) -> RequestKey {
        match self {
            Retrieval::Block { hash, .. } => RequestKey::Block(*hash),
            Retrieval::Receipts { hash, .. } => RequestKey::Receipts(*hash),
            Retrieval::Account { anchor, address } => {
                RequestKey::Account(anchor.state_root, *address)
            }
            Retrieval::TxStatus { hash } => RequestKey::TxStatus(*hash),
            Retrieval::Call {
                anchor,
                address,
                input,
            } => RequestKey::Call(anchor.state_root, *address, Hash::digest(input)),
        }
    }

    /// Block height the serving peer must hold, when one is implied.
    pub fn target_number(&self) -> Option<u64> {
        match self {
            Retrieval::Block { anchor, .. }
            | Retrieval::Receipts { anchor, .. }
            | Retrieval::Account { anchor, .. }
            | Retrieval::Call { anchor, .. } => Some(anchor.number),
            Retrieval::TxStatus { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Retrieval::Block { .. } => "block",
            Retrieval::Receipts { .. } => "receipts",
            Retrieval::Account { .. } => "account",
            Retrieval::TxStatus { .. } => "tx_status",
            Retrieval::Call { .. } => "call",
        }
    }
}

/// Where a transaction landed, extracted from a validated inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxStatusRecord {
    pub transaction: Transaction,
    pub block_hash: Hash,
    pub block_number: u64,
    pub index: u32,
}

/// A validated retrieval result, cached per key for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Block(Body),
    Receipts(Vec<Receipt>),
    Account(wisp_types::Account),
    TxStatus(TxStatusRecord),
    Call(Vec<u8>),
}
