//! Structured logging configuration.

use reasoner_core::{config::LoggingConfig, Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to the configured directive.
pub fn build_filter(fallback: &str) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => parse_filter(&directive),
        _ => parse_filter(fallback),
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn configure_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.filter)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    installed.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::debug!(json = config.json, "Tracing configured");
    Ok(())
}
