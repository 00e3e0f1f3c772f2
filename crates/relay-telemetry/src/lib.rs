//! Logging setup for relay
//!
//! Installs a `tracing-subscriber` formatter driven by [`LoggingConfig`].
//! `RUST_LOG`, when set, takes precedence over the configured filter.

use relay_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.filter);

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// Filter from `RUST_LOG`, else the configured directive, else `info`
fn build_filter(env: Option<&str>, configured: &str) -> EnvFilter {
    env.filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_configured_filter() {
        let filter = build_filter(Some("relay_auth=debug"), "warn");
        assert_eq!(filter.to_string(), "relay_auth=debug");
    }

    #[test]
    fn blank_environment_uses_configured_filter() {
        assert_eq!(build_filter(None, "warn").to_string(), "warn");
        assert_eq!(build_filter(Some("  "), "debug").to_string(), "debug");
    }
}
