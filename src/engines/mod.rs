//! # Database Engine Rotators
//!
//! Each supported database engine implements [`EngineRotator`]: change a
//! login's password using the current credentials, and verify a credential
//! can connect. The [`EngineRotatorRegistry`] maps the `engine` field of a
//! stored credential onto its rotator.

pub mod postgres;
pub mod registry;
pub mod sqlserver;

pub use postgres::PostgresRotator;
pub use registry::EngineRotatorRegistry;
pub use sqlserver::SqlServerRotator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::CredentialRecord;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// PostgreSQL
    Postgres,
    /// Microsoft SQL Server
    SqlServer,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Postgres, Engine::SqlServer];

    /// The identifier stored in the credential's `engine` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
        }
    }
}

impl FromStr for Engine {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "sqlserver" => Ok(Self::SqlServer),
            _ => Err(Error::unsupported_engine(s)),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-engine credential rotation.
///
/// Implementations are stateless apart from connection settings and must
/// never log password values.
#[async_trait]
pub trait EngineRotator: Send + Sync + fmt::Debug {
    /// Engine this rotator handles
    fn engine(&self) -> Engine;

    /// Connect with `current` and set the login's password to `new_password`.
    ///
    /// # Errors
    ///
    /// - `Connection` if the database cannot be reached or rejects the login
    /// - `Rotation` if the password change statement fails
    async fn rotate(&self, current: &CredentialRecord, new_password: &SecretString) -> Result<()>;

    /// Connect with `credential` and run a liveness check.
    ///
    /// # Errors
    ///
    /// - `Connection` on any failure
    async fn test(&self, credential: &CredentialRecord) -> Result<()>;
}
