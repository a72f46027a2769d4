//! On-demand retrieval (ODR) engine for the wisp light client.
//!
//! Callers ask for typed chain data (block bodies, receipts, accounts,
//! transaction status, contract-call results) anchored to a locally trusted
//! header. The engine dispatches each request to a capable peer, validates
//! the returned proof against the anchor, retries across peers on failure or
//! timeout, caches verified results for the session, and collapses
//! concurrent identical requests into a single network round-trip.

pub mod engine;
pub mod error;
pub mod request;
pub mod validate;

pub use engine::{OdrConfig, OdrEngine};
pub use error::OdrError;
pub use request::{Payload, RequestKey, Retrieval, TxStatusRecord};
