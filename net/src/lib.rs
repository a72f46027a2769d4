//! Peer capability surface for the wisp light client.
//!
//! The transport layer (framing, handshakes, sockets) is an external
//! collaborator. What the sync core sees of a peer is a [`PeerHandle`]: a
//! typed request channel plus the head that peer has advertised. The
//! [`PeerSet`] tracks registered peers and fans lifecycle events out to the
//! fetcher and the ODR engine.

pub mod error;
pub mod message;
pub mod peer;
pub mod set;

pub use error::NetError;
pub use message::{Announcement, PeerRequest};
pub use peer::{AdvertisedHead, PeerHandle};
pub use set::{PeerEvent, PeerSet};
