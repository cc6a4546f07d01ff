//! # Configuration Management
//!
//! Loads [`RotatorConfig`] from `ROTATOR_*` environment variables. Unset
//! variables fall back to the defaults in [`settings`].

pub mod settings;

pub use settings::{EngineConfig, ObservabilityConfig, RotatorConfig, SecretStoreConfig};

use std::str::FromStr;

use crate::errors::{Error, Result};

impl RotatorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let obs = &mut config.observability;
        if let Some(name) = lookup("ROTATOR_SERVICE_NAME") {
            obs.service_name = name;
        }
        if let Some(level) = lookup("ROTATOR_LOG_LEVEL") {
            obs.log_level = level;
        }
        obs.json_logging = parse_or(&lookup, "ROTATOR_LOG_JSON", obs.json_logging)?;
        obs.enable_metrics = parse_or(&lookup, "ROTATOR_ENABLE_METRICS", obs.enable_metrics)?;

        let engines = &mut config.engines;
        engines.postgres_connect_timeout_seconds = parse_or(
            &lookup,
            "ROTATOR_POSTGRES_CONNECT_TIMEOUT_SECS",
            engines.postgres_connect_timeout_seconds,
        )?;
        if let Some(mode) = lookup("ROTATOR_POSTGRES_SSL_MODE") {
            engines.postgres_ssl_mode = mode;
        }
        engines.sqlserver_connect_timeout_seconds = parse_or(
            &lookup,
            "ROTATOR_SQLSERVER_CONNECT_TIMEOUT_SECS",
            engines.sqlserver_connect_timeout_seconds,
        )?;
        engines.sqlserver_trust_server_certificate = parse_or(
            &lookup,
            "ROTATOR_SQLSERVER_TRUST_CERT",
            engines.sqlserver_trust_server_certificate,
        )?;
        engines.sqlserver_ca_certificate = lookup("ROTATOR_SQLSERVER_CA_CERT");

        config.store.region = lookup("ROTATOR_SECRETS_REGION").or_else(|| lookup("AWS_REGION"));
        config.store.endpoint_url = lookup("ROTATOR_SECRETS_ENDPOINT_URL");

        let password = &mut config.password;
        password.length = parse_or(&lookup, "ROTATOR_PASSWORD_LENGTH", password.length)?;
        password.exclude_punctuation = parse_or(
            &lookup,
            "ROTATOR_PASSWORD_EXCLUDE_PUNCTUATION",
            password.exclude_punctuation,
        )?;

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
