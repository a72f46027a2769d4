//! Static per-session trust configuration.

use std::collections::HashSet;

use wisp_types::PeerId;

/// The set of trusted peer identities plus the fraction of them (in percent)
/// that must confirm a head candidate before it is acted upon. Immutable for
/// the session; a peer absent from the set is simply untrusted.
#[derive(Clone, Debug, Default)]
pub struct TrustConfig {
    trusted: HashSet<PeerId>,
    fraction: u8,
}

impl TrustConfig {
    /// Build a trust configuration. `fraction` is clamped to 100.
    pub fn new(trusted: impl IntoIterator<Item = PeerId>, fraction: u8) -> Self {
        Self {
            trusted: trusted.into_iter().collect(),
            fraction: fraction.min(100),
        }
    }

    /// No trusted peers configured: any single confirmation suffices.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_trusted(&self, peer: &PeerId) -> bool {
        self.trusted.contains(peer)
    }

    pub fn required_fraction(&self) -> u8 {
        self.fraction
    }

    /// Whether any trusted peers are configured at all.
    pub fn has_trusted(&self) -> bool {
        !self.trusted.is_empty()
    }
}
