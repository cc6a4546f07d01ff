//! In-memory secret store.
//!
//! Implements the full [`SecretStore`] contract in process: versioned
//! values, token-scoped idempotent writes and atomic stage moves. Used by
//! the test suites and for dry runs of the rotation steps without a
//! remote store.
//!
//! # Stage semantics
//!
//! - Attaching a stage to a version detaches it from every other version
//! - When `AWSCURRENT` lands on a new version the old holder is labelled
//!   `AWSPREVIOUS`, and `AWSPENDING` is cleared from the promoted version,
//!   which completes the rotation
//!
//! # Example
//!
//! ```rust,ignore
//! let store = InMemorySecretStore::new();
//! store.seed_version("db/app", "v1", Some(payload), &[VersionStage::Current]).await;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{PutSecretValue, SecretStore, SecretValue, VersionStages};
use super::types::SecretString;
use crate::domain::{VersionId, VersionStage};
use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
struct StoredVersion {
    secret_string: Option<SecretString>,
    stages: BTreeSet<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SecretEntry {
    versions: BTreeMap<VersionId, StoredVersion>,
}

impl SecretEntry {
    fn holder_of(&self, stage: VersionStage) -> Option<VersionId> {
        self.versions
            .iter()
            .find(|(_, version)| version.stages.contains(stage.as_str()))
            .map(|(id, _)| id.clone())
    }

    fn detach(&mut self, stage: VersionStage) {
        for version in self.versions.values_mut() {
            version.stages.remove(stage.as_str());
        }
    }

    /// Attach `stage` to `target`, detaching it everywhere else.
    fn attach(&mut self, stage: VersionStage, target: &VersionId) {
        let displaced = self.holder_of(stage).filter(|holder| holder != target);

        self.detach(stage);
        if let Some(version) = self.versions.get_mut(target) {
            version.stages.insert(stage.as_str().to_string());
            if stage == VersionStage::Current {
                version.stages.remove(VersionStage::Pending.as_str());
            }
        }

        if stage == VersionStage::Current {
            if let Some(previous) = displaced {
                self.detach(VersionStage::Previous);
                if let Some(version) = self.versions.get_mut(&previous) {
                    version.stages.insert(VersionStage::Previous.as_str().to_string());
                }
            }
        }
    }
}

/// Snapshot of the operation counters of an [`InMemorySecretStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub puts: usize,
    pub stage_moves: usize,
    pub describes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicUsize,
    puts: AtomicUsize,
    stage_moves: AtomicUsize,
    describes: AtomicUsize,
}

/// Versioned secret store held in memory
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, SecretEntry>>,
    counters: Counters,
}

impl InMemorySecretStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a version directly, bypassing idempotency checks.
    ///
    /// Stages are attached with the same semantics as a write.
    pub async fn seed_version(
        &self,
        secret_id: &str,
        version_id: impl Into<VersionId>,
        secret_string: Option<&str>,
        stages: &[VersionStage],
    ) {
        let version_id = version_id.into();
        let mut secrets = self.secrets.write().await;
        let entry = secrets.entry(secret_id.to_string()).or_default();

        entry.versions.insert(
            version_id.clone(),
            StoredVersion {
                secret_string: secret_string.map(SecretString::from),
                stages: BTreeSet::new(),
                created_at: Utc::now(),
            },
        );
        for stage in stages {
            entry.attach(*stage, &version_id);
        }
    }

    /// Number of versions stored for a secret
    pub async fn version_count(&self, secret_id: &str) -> usize {
        self.secrets.read().await.get(secret_id).map_or(0, |entry| entry.versions.len())
    }

    /// Raw payload of a specific version
    pub async fn payload_of(
        &self,
        secret_id: &str,
        version_id: &VersionId,
    ) -> Option<SecretString> {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .and_then(|entry| entry.versions.get(version_id))
            .and_then(|version| version.secret_string.clone())
    }

    /// Creation time of a specific version
    pub async fn created_at(
        &self,
        secret_id: &str,
        version_id: &VersionId,
    ) -> Option<DateTime<Utc>> {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .and_then(|entry| entry.versions.get(version_id))
            .map(|version| version.created_at)
    }

    /// Counters of store calls made so far
    pub fn operation_counts(&self) -> OperationCounts {
        OperationCounts {
            gets: self.counters.gets.load(Ordering::SeqCst),
            puts: self.counters.puts.load(Ordering::SeqCst),
            stage_moves: self.counters.stage_moves.load(Ordering::SeqCst),
            describes: self.counters.describes.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret_value(&self, secret_id: &str, stage: VersionStage) -> Result<SecretValue> {
        self.counters.gets.fetch_add(1, Ordering::SeqCst);

        let secrets = self.secrets.read().await;
        let entry = secrets.get(secret_id).ok_or_else(|| Error::secret_not_found(secret_id))?;
        let version_id =
            entry.holder_of(stage).ok_or_else(|| Error::not_found(secret_id, stage))?;
        let secret_string =
            entry.versions.get(&version_id).and_then(|version| version.secret_string.clone());

        Ok(SecretValue { version_id, secret_string })
    }

    /// Unknown secrets are created on first write.
    async fn put_secret_value(&self, request: PutSecretValue) -> Result<VersionId> {
        self.counters.puts.fetch_add(1, Ordering::SeqCst);

        let version_id = VersionId::new(request.client_request_token.as_str());
        let mut secrets = self.secrets.write().await;
        let entry = secrets.entry(request.secret_id.clone()).or_default();

        if let Some(existing) = entry.versions.get(&version_id) {
            if existing.secret_string.as_ref() == Some(&request.secret_string) {
                debug!(
                    secret_id = %request.secret_id,
                    version_id = %version_id,
                    "Version already stored for request token"
                );
                return Ok(version_id);
            }
            return Err(Error::store_conflict(format!(
                "version '{}' of secret '{}' already exists with different content",
                version_id, request.secret_id
            )));
        }

        entry.versions.insert(
            version_id.clone(),
            StoredVersion {
                secret_string: Some(request.secret_string),
                stages: BTreeSet::new(),
                created_at: Utc::now(),
            },
        );
        for stage in &request.version_stages {
            entry.attach(*stage, &version_id);
        }

        Ok(version_id)
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        remove_from: &VersionId,
        move_to: &VersionId,
    ) -> Result<()> {
        self.counters.stage_moves.fetch_add(1, Ordering::SeqCst);

        let mut secrets = self.secrets.write().await;
        let entry = secrets.get_mut(secret_id).ok_or_else(|| Error::secret_not_found(secret_id))?;

        let source = entry.versions.get(remove_from).ok_or_else(|| {
            Error::store_conflict(format!("version '{}' no longer exists", remove_from))
        })?;
        if !source.stages.contains(stage.as_str()) {
            return Err(Error::store_conflict(format!(
                "stage {} is not attached to version '{}'",
                stage, remove_from
            )));
        }
        if !entry.versions.contains_key(move_to) {
            return Err(Error::store_conflict(format!("version '{}' no longer exists", move_to)));
        }

        entry.attach(stage, move_to);
        Ok(())
    }

    async fn describe_version_stages(&self, secret_id: &str) -> Result<VersionStages> {
        self.counters.describes.fetch_add(1, Ordering::SeqCst);

        let secrets = self.secrets.read().await;
        let entry = secrets.get(secret_id).ok_or_else(|| Error::secret_not_found(secret_id))?;

        Ok(entry
            .versions
            .iter()
            .map(|(id, version)| (id.clone(), version.stages.clone()))
            .collect())
    }
}
