//! Fundamental types for the wisp light client.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: hashes, cumulative chain weights, headers, block bodies,
//! receipts, accounts, and the merkle audit paths that anchor retrieved data
//! to a locally trusted header.

pub mod account;
pub mod block;
pub mod hash;
pub mod header;
pub mod peer;
pub mod proof;
pub mod weight;

pub use account::{execute_call, Account, Address};
pub use block::{receipts_root, Body, Receipt, Transaction};
pub use hash::Hash;
pub use header::Header;
pub use peer::PeerId;
pub use proof::{merkle_root, AccountProof, AuditPath, TxStatusProof};
pub use weight::Weight;
