//! Versioned secret store access.
//!
//! The rotation core never talks to a secret store directly. It goes through
//! a [`VersionStageGateway`], which wraps any [`SecretStore`] implementation
//! and speaks in terms of [`CredentialRecord`](crate::domain::CredentialRecord)s
//! and [`VersionStage`](crate::domain::VersionStage)s.
//!
//! # Backends
//!
//! - [`InMemorySecretStore`]: process-local store for tests and dry runs
//! - `AwsSecretsManagerStore`: AWS Secrets Manager (feature `aws`)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use db_secret_rotator::domain::VersionStage;
//! use db_secret_rotator::secrets::{InMemorySecretStore, VersionStageGateway};
//!
//! let store = Arc::new(InMemorySecretStore::new());
//! let gateway = VersionStageGateway::new(store, "db/app", "token-1");
//! let current = gateway.fetch(VersionStage::Current).await?;
//! ```

#[cfg(feature = "aws")]
pub mod aws;
pub mod gateway;
pub mod memory;
pub mod password;
pub mod store;
pub mod types;

#[cfg(feature = "aws")]
pub use aws::AwsSecretsManagerStore;
pub use gateway::{StageSnapshot, VersionStageGateway};
pub use memory::{InMemorySecretStore, OperationCounts};
pub use password::PasswordPolicy;
pub use store::{PutSecretValue, SecretStore, SecretValue, VersionStages};
pub use types::SecretString;
