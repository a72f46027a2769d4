//! Local chain state for the wisp light client.
//!
//! [`HeaderChain`] is the header-only chain a light client maintains: it
//! answers `get_header`/`get_total_weight` lookups and accepts verified
//! header batches from the sync driver. [`FullBackend`] layers bodies,
//! receipts, and account state on top, and is what a node uses when it runs
//! with full chain data available (the ODR engine's local shortcut) — it is
//! also the data source behind mock peers in tests.

pub mod error;
pub mod full;
pub mod light;

pub use error::ChainError;
pub use full::{FullBackend, StateSnapshot};
pub use light::{ChainHead, HeaderChain};
