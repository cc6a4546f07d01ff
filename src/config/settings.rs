//! # Configuration Settings
//!
//! Defines the configuration structure for the credential rotator.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::{Error, Result};
use crate::secrets::PasswordPolicy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct RotatorConfig {
    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Database engine connection settings
    #[validate(nested)]
    pub engines: EngineConfig,

    /// Secret store client settings
    #[validate(nested)]
    pub store: SecretStoreConfig,

    /// Policy for newly generated passwords
    #[validate(nested)]
    pub password: PasswordPolicy,
}

impl RotatorConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        self.engines.postgres_ssl_mode.parse::<sqlx::postgres::PgSslMode>().map_err(|_| {
            Error::config(format!(
                "Unknown Postgres ssl mode '{}'",
                self.engines.postgres_ssl_mode
            ))
        })?;

        self.password.check()
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to log records
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Record step counters and durations through the `metrics` facade.
    /// Takes effect only in a process that installs a metrics recorder.
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "db-secret-rotator".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: true,
        }
    }
}

/// Database engine connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Postgres connect timeout in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connect timeout must be between 1 and 300 seconds"
    ))]
    pub postgres_connect_timeout_seconds: u64,

    /// Postgres `sslmode` (disable, allow, prefer, require, verify-ca, verify-full)
    pub postgres_ssl_mode: String,

    /// SQL Server connect and dial timeout in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connect timeout must be between 1 and 300 seconds"
    ))]
    pub sqlserver_connect_timeout_seconds: u64,

    /// Accept any SQL Server certificate
    pub sqlserver_trust_server_certificate: bool,

    /// CA certificate used to validate the SQL Server certificate
    pub sqlserver_ca_certificate: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            postgres_connect_timeout_seconds: 5,
            postgres_ssl_mode: "require".to_string(),
            sqlserver_connect_timeout_seconds: 30,
            sqlserver_trust_server_certificate: false,
            sqlserver_ca_certificate: None,
        }
    }
}

impl EngineConfig {
    pub fn postgres_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.postgres_connect_timeout_seconds)
    }

    pub fn sqlserver_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.sqlserver_connect_timeout_seconds)
    }
}

/// Secret store client settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct SecretStoreConfig {
    /// Region override; the SDK default chain applies when unset
    #[validate(length(min = 1, message = "Region cannot be empty"))]
    pub region: Option<String>,

    /// Endpoint override (for local emulators)
    #[validate(url(message = "Endpoint must be a valid URL"))]
    pub endpoint_url: Option<String>,
}
