//! Secret store collaborator trait.
//!
//! [`SecretStore`] is the narrow set of versioned-store primitives the
//! rotation core needs. Transport, authentication and persistence belong to
//! the implementation.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use super::password::PasswordPolicy;
use super::types::SecretString;
use crate::domain::{VersionId, VersionStage};
use crate::errors::Result;

/// Stage labels attached to each version of a secret, as reported by the
/// store. Labels the core does not know are kept verbatim.
pub type VersionStages = BTreeMap<VersionId, BTreeSet<String>>;

/// One secret version as returned by the store
#[derive(Debug, Clone)]
pub struct SecretValue {
    pub version_id: VersionId,
    /// `None` when the version holds no string payload
    pub secret_string: Option<SecretString>,
}

/// Request to store a new secret version
#[derive(Debug, Clone)]
pub struct PutSecretValue {
    pub secret_id: String,
    /// Idempotency token; the store uses it as the new version id
    pub client_request_token: String,
    pub secret_string: SecretString,
    pub version_stages: Vec<VersionStage>,
}

/// Trait for versioned secret stores.
///
/// # Contract
///
/// - `put_secret_value` is idempotent per token: repeating it with the same
///   token and content returns the same version; reusing a token with
///   different content fails with `StoreConflict`
/// - attaching a stage to a version detaches it from every other version
/// - `update_version_stage` is atomic and fails with `StoreConflict` when
///   `remove_from` does not currently hold the stage or a version is gone
///
/// Implementations MUST NOT log secret values.
#[async_trait]
pub trait SecretStore: Send + Sync + std::fmt::Debug {
    /// Fetch the version currently holding `stage`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the secret or the stage does not exist
    async fn get_secret_value(&self, secret_id: &str, stage: VersionStage) -> Result<SecretValue>;

    /// Store a new version tagged with the requested stages.
    async fn put_secret_value(&self, request: PutSecretValue) -> Result<VersionId>;

    /// Move `stage` from `remove_from` to `move_to` in one operation.
    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        remove_from: &VersionId,
        move_to: &VersionId,
    ) -> Result<()>;

    /// Snapshot of version id to stage labels for the secret.
    async fn describe_version_stages(&self, secret_id: &str) -> Result<VersionStages>;

    /// Generate a random password.
    ///
    /// Stores with a server-side generator override this; the default
    /// generates locally.
    async fn random_password(&self, policy: &PasswordPolicy) -> Result<SecretString> {
        policy.generate()
    }
}
