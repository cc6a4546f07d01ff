//! AWS Secrets Manager backed [`SecretStore`].
//!
//! Versions are keyed by the rotation token, so repeating a `createSecret`
//! put is a no-op on the service side. Error codes from the service are
//! mapped onto the rotation error taxonomy.

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use tracing::{debug, info};

use super::password::PasswordPolicy;
use super::store::{PutSecretValue, SecretStore, SecretValue, VersionStages};
use super::types::SecretString;
use crate::config::SecretStoreConfig;
use crate::domain::{VersionId, VersionStage};
use crate::errors::{Error, Result};

/// Secret store client for AWS Secrets Manager
#[derive(Clone)]
pub struct AwsSecretsManagerStore {
    client: SecretsManagerClient,
    region: Option<String>,
}

impl std::fmt::Debug for AwsSecretsManagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManagerStore").field("region", &self.region).finish()
    }
}

impl AwsSecretsManagerStore {
    /// Wrap an existing SDK client
    pub fn new(client: SecretsManagerClient) -> Self {
        let region = client.config().region().map(|r| r.to_string());
        Self { client, region }
    }

    /// Build a client from the default AWS credential chain.
    ///
    /// Region and endpoint overrides from `config` take precedence over the
    /// SDK's own environment lookup.
    pub async fn from_config(config: &SecretStoreConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        if sdk_config.region().is_none() {
            return Err(Error::config("No AWS region configured for the secret store"));
        }

        let store = Self::new(SecretsManagerClient::new(&sdk_config));
        info!(
            region = ?store.region,
            endpoint = ?config.endpoint_url,
            "Initialized AWS Secrets Manager store"
        );
        Ok(store)
    }
}

/// Map a service error code onto the rotation taxonomy
fn map_service_error<E>(secret_id: &str, stage: Option<VersionStage>, err: E) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match err.code() {
        Some("ResourceNotFoundException") => {
            Error::NotFound { secret_id: secret_id.to_string(), stage }
        }
        Some("InvalidRequestException")
        | Some("InvalidParameterException")
        | Some("ResourceExistsException") => Error::store_conflict(message),
        _ => Error::upstream(message),
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    #[tracing::instrument(skip(self), fields(store = "aws"))]
    async fn get_secret_value(&self, secret_id: &str, stage: VersionStage) -> Result<SecretValue> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .send()
            .await
            .map_err(|e| map_service_error(secret_id, Some(stage), e))?;

        let version_id = output.version_id().map(VersionId::new).ok_or_else(|| {
            Error::upstream(format!("Secret '{}' returned no version id", secret_id))
        })?;

        Ok(SecretValue { version_id, secret_string: output.secret_string().map(SecretString::new) })
    }

    #[tracing::instrument(
        skip(self, request),
        fields(store = "aws", secret_id = %request.secret_id)
    )]
    async fn put_secret_value(&self, request: PutSecretValue) -> Result<VersionId> {
        let stages = request.version_stages.iter().map(|s| s.as_str().to_string()).collect();

        let output = self
            .client
            .put_secret_value()
            .secret_id(&request.secret_id)
            .client_request_token(&request.client_request_token)
            .secret_string(request.secret_string.expose_secret())
            .set_version_stages(Some(stages))
            .send()
            .await
            .map_err(|e| map_service_error(&request.secret_id, None, e))?;

        let version_id = output
            .version_id()
            .map(VersionId::new)
            .unwrap_or_else(|| VersionId::new(request.client_request_token.clone()));
        debug!(version_id = %version_id, "Put secret value");
        Ok(version_id)
    }

    #[tracing::instrument(skip(self), fields(store = "aws"))]
    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        remove_from: &VersionId,
        move_to: &VersionId,
    ) -> Result<()> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .remove_from_version_id(remove_from.as_str())
            .move_to_version_id(move_to.as_str())
            .send()
            .await
            .map_err(|e| map_service_error(secret_id, Some(stage), e))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(store = "aws"))]
    async fn describe_version_stages(&self, secret_id: &str) -> Result<VersionStages> {
        let output = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| map_service_error(secret_id, None, e))?;

        let stages = output
            .version_ids_to_stages()
            .map(|versions| {
                versions
                    .iter()
                    .map(|(id, labels)| {
                        (VersionId::new(id.as_str()), labels.iter().cloned().collect())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(stages)
    }

    async fn random_password(&self, policy: &PasswordPolicy) -> Result<SecretString> {
        policy.check()?;

        let output = self
            .client
            .get_random_password()
            .password_length(policy.length as i64)
            .exclude_lowercase(policy.exclude_lowercase)
            .exclude_uppercase(policy.exclude_uppercase)
            .exclude_numbers(policy.exclude_numbers)
            .exclude_punctuation(policy.exclude_punctuation)
            .include_space(policy.include_space)
            .require_each_included_type(policy.require_each_included_type)
            .send()
            .await
            .map_err(|e| Error::upstream(DisplayErrorContext(&e).to_string()))?;

        output
            .random_password()
            .map(SecretString::new)
            .ok_or_else(|| Error::upstream("GetRandomPassword returned no password"))
    }
}
