//! Rotation steps and the scheduler's invocation request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// One step of the four-step rotation contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationStep {
    #[serde(rename = "createSecret")]
    CreateSecret,
    #[serde(rename = "setSecret")]
    SetSecret,
    #[serde(rename = "testSecret")]
    TestSecret,
    #[serde(rename = "finishSecret")]
    FinishSecret,
}

impl RotationStep {
    /// All steps in the order the scheduler invokes them
    pub const ALL: [RotationStep; 4] =
        [Self::CreateSecret, Self::SetSecret, Self::TestSecret, Self::FinishSecret];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl FromStr for RotationStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| Error::config(format!("Unknown rotation step: {}", s)))
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step invocation for one secret and one rotation attempt.
///
/// Deserializes from the scheduler event shape:
///
/// ```json
/// {"ClientRequestToken": "…", "SecretId": "…", "Step": "createSecret"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationRequest {
    /// Idempotency token identifying this rotation attempt
    #[serde(rename = "ClientRequestToken")]
    pub client_request_token: String,

    #[serde(rename = "SecretId")]
    pub secret_id: String,

    #[serde(rename = "Step")]
    pub step: RotationStep,
}

impl RotationRequest {
    pub fn new(
        secret_id: impl Into<String>,
        client_request_token: impl Into<String>,
        step: RotationStep,
    ) -> Self {
        Self {
            client_request_token: client_request_token.into(),
            secret_id: secret_id.into(),
            step,
        }
    }

    /// The same rotation attempt, at a different step
    pub fn at_step(&self, step: RotationStep) -> Self {
        Self { step, ..self.clone() }
    }
}
