//! Version stage gateway.
//!
//! Typed access to the credential stored under one secret id, scoped to one
//! rotation attempt. All reads resolve a stage to its current version; all
//! writes carry the attempt's idempotency token.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::password::PasswordPolicy;
use super::store::{PutSecretValue, SecretStore, VersionStages};
use super::types::SecretString;
use crate::domain::{CredentialRecord, VersionId, VersionStage};
use crate::errors::{Error, Result};

/// Version to stage mapping restricted to the stages the core reasons about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSnapshot {
    versions: BTreeMap<VersionId, BTreeSet<VersionStage>>,
}

impl StageSnapshot {
    /// Build from the store's raw labels, dropping labels the core does not know
    pub fn from_labels(labels: &VersionStages) -> Self {
        let versions = labels
            .iter()
            .map(|(id, stages)| {
                let known = stages.iter().filter_map(|label| label.parse().ok()).collect();
                (id.clone(), known)
            })
            .collect();
        Self { versions }
    }

    /// Add a version with its stages
    pub fn with_version(mut self, id: impl Into<VersionId>, stages: &[VersionStage]) -> Self {
        self.versions.insert(id.into(), stages.iter().copied().collect());
        self
    }

    /// The version holding `stage`, if any
    pub fn version_for(&self, stage: VersionStage) -> Option<&VersionId> {
        self.holders(stage).next()
    }

    /// Every version holding `stage`
    pub fn holders(&self, stage: VersionStage) -> impl Iterator<Item = &VersionId> {
        self.versions.iter().filter(move |(_, stages)| stages.contains(&stage)).map(|(id, _)| id)
    }

    /// Stages attached to a version
    pub fn stages_of(&self, id: &VersionId) -> Option<&BTreeSet<VersionStage>> {
        self.versions.get(id)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Stage-aware access to one secret for one rotation attempt
#[derive(Debug, Clone)]
pub struct VersionStageGateway {
    store: Arc<dyn SecretStore>,
    secret_id: String,
    client_request_token: String,
}

impl VersionStageGateway {
    pub fn new(
        store: Arc<dyn SecretStore>,
        secret_id: impl Into<String>,
        client_request_token: impl Into<String>,
    ) -> Self {
        Self {
            store,
            secret_id: secret_id.into(),
            client_request_token: client_request_token.into(),
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn client_request_token(&self) -> &str {
        &self.client_request_token
    }

    /// Fetch and decode the credential at `stage`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no version holds the stage or it has no string value
    /// - `Decode` if the payload is not a credential record
    pub async fn fetch(&self, stage: VersionStage) -> Result<CredentialRecord> {
        let value = self.store.get_secret_value(&self.secret_id, stage).await?;
        let payload =
            value.secret_string.ok_or_else(|| Error::not_found(&self.secret_id, stage))?;
        let record = CredentialRecord::from_json(payload.expose_secret())?;

        debug!(
            secret_id = %self.secret_id,
            stage = %stage,
            version_id = %value.version_id,
            engine = %record.engine,
            "Fetched credentials"
        );
        Ok(record)
    }

    /// Store `record` as a new version tagged with `stage`, keyed by the
    /// attempt's idempotency token.
    pub async fn write(&self, record: &CredentialRecord, stage: VersionStage) -> Result<VersionId> {
        let payload = SecretString::new(record.to_json()?);
        let version_id = self
            .store
            .put_secret_value(PutSecretValue {
                secret_id: self.secret_id.clone(),
                client_request_token: self.client_request_token.clone(),
                secret_string: payload,
                version_stages: vec![stage],
            })
            .await?;

        info!(
            secret_id = %self.secret_id,
            stage = %stage,
            version_id = %version_id,
            "Stored credentials"
        );
        Ok(version_id)
    }

    /// Atomically move `stage` from one version to another.
    pub async fn move_stage(
        &self,
        stage: VersionStage,
        from: &VersionId,
        to: &VersionId,
    ) -> Result<()> {
        self.store.update_version_stage(&self.secret_id, stage, from, to).await?;

        info!(
            secret_id = %self.secret_id,
            stage = %stage,
            from_version = %from,
            to_version = %to,
            "Moved version stage"
        );
        Ok(())
    }

    /// Current version to stage mapping
    pub async fn versions_by_stage(&self) -> Result<StageSnapshot> {
        let labels = self.store.describe_version_stages(&self.secret_id).await?;
        Ok(StageSnapshot::from_labels(&labels))
    }

    /// Generate a password through the store's facility
    pub async fn generate_password(&self, policy: &PasswordPolicy) -> Result<SecretString> {
        self.store.random_password(policy).await
    }
}
