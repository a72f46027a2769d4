use thiserror::Error;

use wisp_types::PeerId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetError {
    /// The peer's request channel is gone — it disconnected or was dropped
    /// mid-flight. Retried locally by the ODR engine, never surfaced to
    /// callers on its own.
    #[error("peer {0} unavailable")]
    PeerUnavailable(PeerId),

    #[error("peer {0} already registered")]
    AlreadyRegistered(PeerId),

    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}
