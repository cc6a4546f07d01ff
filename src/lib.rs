//! # db-secret-rotator
//!
//! Rotates database credentials held in a versioned secret store using a
//! four-step protocol driven by an external scheduler.
//!
//! ## Architecture
//!
//! ```text
//! scheduler → SecretRotator ─┬→ VersionStageGateway → SecretStore
//!                            └→ EngineRotatorRegistry → EngineRotator (Postgres, SQL Server)
//! ```
//!
//! Rotation state lives entirely in the stage labels of the secret's
//! versions (`AWSCURRENT`, `AWSPENDING`, `AWSPREVIOUS`). Every step reads
//! that layout afresh, so each step can be retried on its own.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use db_secret_rotator::{
//!     EngineRotatorRegistry, InMemorySecretStore, PasswordPolicy, RotationRequest,
//!     RotationStep, RotatorConfig, SecretRotator,
//! };
//!
//! let config = RotatorConfig::from_env()?;
//! let rotator = SecretRotator::new(
//!     Arc::new(InMemorySecretStore::new()),
//!     EngineRotatorRegistry::with_defaults(&config.engines),
//!     PasswordPolicy::default(),
//! );
//! rotator.handle(&RotationRequest::new("db/app", "token", RotationStep::CreateSecret)).await?;
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod engines;
pub mod errors;
pub mod observability;
pub mod rotation;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::RotatorConfig;
pub use domain::{CredentialRecord, RotationRequest, RotationStep, VersionId, VersionStage};
pub use engines::{Engine, EngineRotator, EngineRotatorRegistry};
pub use errors::{Error, ErrorKind, Result};
pub use rotation::{SecretRotator, StepOutcome};
pub use secrets::{InMemorySecretStore, PasswordPolicy, SecretStore, SecretString};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
