//! # Observability Infrastructure
//!
//! Structured logging through `tracing` and step metrics through the
//! `metrics` facade. Exporting metrics is left to whichever recorder the
//! host process installs.

pub mod metrics;

pub use metrics::{register_rotation_metrics, RotationMetrics};

use ::tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set. Returns an error if
/// the filter directive is invalid or a subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(&config.log_level),
    }
    .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = if config.json_logging {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))?;

    if config.enable_metrics {
        register_rotation_metrics();
    }

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        metrics_enabled = config.enable_metrics,
        "Observability initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_installs_once() {
        let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };

        // a second install in the same process is an error, not a panic
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
