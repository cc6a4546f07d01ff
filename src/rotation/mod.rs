//! # Rotation State Machine
//!
//! Runs one step of the four-step rotation contract per invocation:
//!
//! 1. `createSecret`: store a copy of CURRENT with a fresh password as PENDING
//! 2. `setSecret`: change the database password to PENDING's, logging in with CURRENT
//! 3. `testSecret`: log in with PENDING
//! 4. `finishSecret`: move CURRENT onto the PENDING version
//!
//! No state is held between invocations. Each step reads the secret's stage
//! layout from the store, so any step may be retried by the scheduler.

pub mod plan;

pub use plan::{plan_finish, FinishPlan};

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::{RotationRequest, RotationStep, VersionId, VersionStage};
use crate::engines::EngineRotatorRegistry;
use crate::errors::{Error, ErrorKind, Result};
use crate::observability::RotationMetrics;
use crate::secrets::{PasswordPolicy, SecretStore, VersionStageGateway};

/// What a successful step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A PENDING version was written
    Created { version_id: VersionId },
    /// PENDING already existed; nothing was written
    AlreadyPending,
    /// The database password was changed
    PasswordSet,
    /// PENDING credentials logged in
    Verified,
    /// CURRENT moved to the PENDING version
    Promoted { from: VersionId, to: VersionId },
    /// CURRENT already held the requested version
    AlreadyCurrent { version_id: VersionId },
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::AlreadyPending => "already_pending",
            Self::PasswordSet => "password_set",
            Self::Verified => "verified",
            Self::Promoted { .. } => "promoted",
            Self::AlreadyCurrent { .. } => "already_current",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation coordinator over a secret store and an engine registry
#[derive(Debug, Clone)]
pub struct SecretRotator {
    store: Arc<dyn SecretStore>,
    registry: Arc<EngineRotatorRegistry>,
    policy: PasswordPolicy,
    metrics: RotationMetrics,
}

impl SecretRotator {
    pub fn new(
        store: Arc<dyn SecretStore>,
        registry: EngineRotatorRegistry,
        policy: PasswordPolicy,
    ) -> Self {
        Self { store, registry: Arc::new(registry), policy, metrics: RotationMetrics::new() }
    }

    /// Replace the step metrics recorder
    pub fn with_metrics(mut self, metrics: RotationMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &EngineRotatorRegistry {
        &self.registry
    }

    /// Run the requested step.
    ///
    /// Errors carry the step and secret id; [`Error::kind`] reports the
    /// underlying category.
    #[tracing::instrument(
        name = "rotation_step",
        skip(self, request),
        fields(secret_id = %request.secret_id, step = %request.step)
    )]
    pub async fn handle(&self, request: &RotationRequest) -> Result<StepOutcome> {
        let started = Instant::now();
        let gateway = VersionStageGateway::new(
            self.store.clone(),
            &request.secret_id,
            &request.client_request_token,
        );

        let result = match request.step {
            RotationStep::CreateSecret => self.create_secret(&gateway).await,
            RotationStep::SetSecret => self.set_secret(&gateway).await,
            RotationStep::TestSecret => self.test_secret(&gateway).await,
            RotationStep::FinishSecret => self.finish_secret(&gateway).await,
        }
        .map_err(|e| e.in_step(request.step, &request.secret_id));

        self.finish(request, &result, started);
        result
    }

    /// Run the requested step, failing with `Cancelled` if `cancel` fires
    /// first. A step abandoned mid-flight never leaves a partial store
    /// write: each store call is a single atomic operation.
    pub async fn handle_with_cancellation(
        &self,
        request: &RotationRequest,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome> {
        let started = Instant::now();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let result = Err(Error::Cancelled.in_step(request.step, &request.secret_id));
                self.finish(request, &result, started);
                result
            }
            result = self.handle(request) => result,
        }
    }

    fn finish(&self, request: &RotationRequest, result: &Result<StepOutcome>, started: Instant) {
        let outcome = match result {
            Ok(outcome) => {
                info!(
                    secret_id = %request.secret_id,
                    step = %request.step,
                    outcome = %outcome,
                    "Rotation step completed"
                );
                outcome.as_str()
            }
            Err(e) => {
                error!(
                    secret_id = %request.secret_id,
                    step = %request.step,
                    kind = %e.kind(),
                    error = %e,
                    "Rotation step failed"
                );
                e.kind().as_str()
            }
        };
        self.metrics.record_step(request.step, outcome, started.elapsed());
    }

    async fn create_secret(&self, gateway: &VersionStageGateway) -> Result<StepOutcome> {
        match gateway.fetch(VersionStage::Pending).await {
            Ok(_) => {
                info!(secret_id = %gateway.secret_id(), "Pending version already exists");
                return Ok(StepOutcome::AlreadyPending);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let current = gateway.fetch(VersionStage::Current).await?;
        let password = gateway.generate_password(&self.policy).await?;
        let version_id =
            gateway.write(&current.with_password(password), VersionStage::Pending).await?;

        Ok(StepOutcome::Created { version_id })
    }

    async fn set_secret(&self, gateway: &VersionStageGateway) -> Result<StepOutcome> {
        let current = gateway.fetch(VersionStage::Current).await?;
        let pending = gateway.fetch(VersionStage::Pending).await?;

        let rotator = self.registry.lookup(&current.engine)?;
        if pending.engine != current.engine || pending.username != current.username {
            warn!(
                secret_id = %gateway.secret_id(),
                current_engine = %current.engine,
                pending_engine = %pending.engine,
                "Pending credentials differ from current beyond the password"
            );
        }

        rotator.rotate(&current, &pending.password).await?;
        Ok(StepOutcome::PasswordSet)
    }

    async fn test_secret(&self, gateway: &VersionStageGateway) -> Result<StepOutcome> {
        let pending = gateway.fetch(VersionStage::Pending).await?;
        let rotator = self.registry.lookup(&pending.engine)?;

        rotator.test(&pending).await?;
        Ok(StepOutcome::Verified)
    }

    async fn finish_secret(&self, gateway: &VersionStageGateway) -> Result<StepOutcome> {
        let snapshot = gateway.versions_by_stage().await?;

        match plan_finish(&snapshot, gateway.secret_id(), gateway.client_request_token())? {
            FinishPlan::AlreadyCurrent { version_id } => {
                info!(
                    secret_id = %gateway.secret_id(),
                    version_id = %version_id,
                    "Version already marked as current"
                );
                Ok(StepOutcome::AlreadyCurrent { version_id })
            }
            FinishPlan::Promote { from, to } => {
                if to.as_str() != gateway.client_request_token() {
                    warn!(
                        secret_id = %gateway.secret_id(),
                        pending_version = %to,
                        "Pending version was not created by this rotation attempt"
                    );
                }
                gateway.move_stage(VersionStage::Current, &from, &to).await?;
                Ok(StepOutcome::Promoted { from, to })
            }
        }
    }
}
