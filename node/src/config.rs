//! Node configuration with TOML file support.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use wisp_fetcher::TrustConfig;
use wisp_odr::OdrConfig;
use wisp_types::PeerId;

use crate::NodeError;

/// Configuration for a wisp light node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Peer identities whose head confirmations count toward the trusted
    /// fraction. Empty means any single confirmation suffices.
    #[serde(default)]
    pub trusted_peers: Vec<String>,

    /// Percentage of trusted peers that must confirm a head candidate.
    #[serde(default = "default_trust_fraction")]
    pub trust_fraction: u8,

    /// Per-peer budget for one retrieval dispatch, in milliseconds.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Overall deadline for one retrieval across all retries, in
    /// milliseconds.
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    /// Upper bound on peers tried per retrieval.
    #[serde(default = "default_retrieval_attempt_limit")]
    pub retrieval_attempt_limit: usize,

    /// Chain distance beyond which a head candidate triggers a full
    /// resynchronization instead of an incremental fetch.
    #[serde(default = "default_resync_threshold")]
    pub resync_threshold: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to enable the Prometheus metrics registry.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_trust_fraction() -> u8 {
    70
}

fn default_dispatch_timeout_ms() -> u64 {
    2_000
}

fn default_request_deadline_ms() -> u64 {
    10_000
}

fn default_retrieval_attempt_limit() -> usize {
    16
}

fn default_resync_threshold() -> u64 {
    64
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Trust registry derived from the configured peer list.
    pub fn trust_config(&self) -> TrustConfig {
        TrustConfig::new(
            self.trusted_peers.iter().map(|id| PeerId::from(id.as_str())),
            self.trust_fraction,
        )
    }

    /// Retrieval timing knobs derived from the millisecond fields.
    pub fn odr_config(&self) -> OdrConfig {
        OdrConfig {
            dispatch_timeout: Duration::from_millis(self.dispatch_timeout_ms),
            request_deadline: Duration::from_millis(self.request_deadline_ms),
            max_attempts: self.retrieval_attempt_limit,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            trusted_peers: Vec::new(),
            trust_fraction: default_trust_fraction(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            request_deadline_ms: default_request_deadline_ms(),
            retrieval_attempt_limit: default_retrieval_attempt_limit(),
            resync_threshold: default_resync_threshold(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.trust_fraction, config.trust_fraction);
        assert_eq!(parsed.resync_threshold, config.resync_threshold);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.trust_fraction, 70);
        assert_eq!(config.dispatch_timeout_ms, 2_000);
        assert_eq!(config.log_format, "human");
        assert!(config.trusted_peers.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            trusted_peers = ["p1", "p2"]
            trust_fraction = 100
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.trust_fraction, 100);
        assert_eq!(config.trusted_peers, vec!["p1", "p2"]);
        assert_eq!(config.log_level, "info"); // default

        let trust = config.trust_config();
        assert!(trust.is_trusted(&PeerId::from("p1")));
        assert!(!trust.is_trusted(&PeerId::from("p3")));
    }

    #[test]
    fn odr_config_converts_milliseconds() {
        let config = NodeConfig {
            dispatch_timeout_ms: 500,
            request_deadline_ms: 3_000,
            ..NodeConfig::default()
        };
        let odr = config.odr_config();
        assert_eq!(odr.dispatch_timeout, Duration::from_millis(500));
        assert_eq!(odr.request_deadline, Duration::from_secs(3));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/wisp.toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, NodeError::Io(_)));
    }
}
