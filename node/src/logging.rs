//! Structured logging for the wisp node.
//!
//! The subscriber is assembled from the node configuration: `log_format`
//! picks human-readable or JSON output and `log_level` seeds the filter
//! (e.g. `"info"` or `"debug,wisp_fetcher=trace"`). A `RUST_LOG`
//! environment variable overrides the configured filter at runtime.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::NodeConfig;

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for development.
    Human,
    /// Newline-delimited JSON for log pipelines.
    Json,
}

impl LogFormat {
    /// Parse the config-file spelling; anything other than "json" is human.
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Human
        }
    }
}

/// Install the global tracing subscriber for this node.
///
/// # Panics
///
/// Panics when a global subscriber is already set in this process.
pub fn init_logging(config: &NodeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let lines = fmt::layer().with_target(true).with_thread_ids(true);
    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_config(&config.log_format) {
        LogFormat::Human => registry.with(lines).init(),
        LogFormat::Json => registry.with(lines.json()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_defaults_to_human() {
        assert_eq!(LogFormat::from_config("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("human"), LogFormat::Human);
        assert_eq!(LogFormat::from_config("anything"), LogFormat::Human);
    }

    #[test]
    fn config_fields_drive_format_selection() {
        let mut config = NodeConfig::default();
        assert_eq!(LogFormat::from_config(&config.log_format), LogFormat::Human);
        config.log_format = "json".into();
        assert_eq!(LogFormat::from_config(&config.log_format), LogFormat::Json);
    }
}
