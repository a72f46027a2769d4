use thiserror::Error;

/// Terminal failures of one retrieval instance. A caller may issue a fresh
/// request later (for example after new peers register); the failed instance
/// itself is settled for good.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OdrError {
    /// Every candidate peer was tried (or none exists) without a validated
    /// response.
    #[error("no remaining peer can serve the request")]
    Exhausted,

    /// The request deadline elapsed before any peer delivered a validated
    /// response. Distinct from exhaustion for observability.
    #[error("request deadline elapsed")]
    TimedOut,
}
