//! PostgreSQL rotator
//!
//! Opens a single `PgConnection` per call; no pooling. Statement logging is
//! disabled on the connection so the password change never reaches the log.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{ConnectOptions, Connection, Executor};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{Engine, EngineRotator};
use crate::config::EngineConfig;
use crate::domain::CredentialRecord;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

const ENGINE: &str = "postgres";

/// Rotator for PostgreSQL logins
#[derive(Debug, Clone)]
pub struct PostgresRotator {
    connect_timeout: Duration,
    ssl_mode: String,
}

impl PostgresRotator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            connect_timeout: config.postgres_connect_timeout(),
            ssl_mode: config.postgres_ssl_mode.clone(),
        }
    }

    /// Connection URL for a credential, with the password percent-encoded.
    pub fn connection_url(&self, credential: &CredentialRecord) -> Result<Url> {
        let authority = if credential.port.is_empty() {
            credential.host.clone()
        } else {
            format!("{}:{}", credential.host, credential.port)
        };

        let mut url = Url::parse(&format!("postgres://{}", authority))
            .map_err(|e| Error::connection(ENGINE, format!("Invalid host or port: {}", e)))?;
        url.set_username(&credential.username)
            .and_then(|_| url.set_password(Some(credential.password.expose_secret())))
            .map_err(|_| Error::connection(ENGINE, "Connection URL cannot carry credentials"))?;
        url.set_path(&credential.database_name);

        let timeout = self.connect_timeout.as_secs().to_string();
        url.query_pairs_mut()
            .append_pair("connect_timeout", &timeout)
            .append_pair("sslmode", &self.ssl_mode);

        Ok(url)
    }

    /// [`connection_url`](Self::connection_url) with the password redacted
    pub fn connection_target(&self, credential: &CredentialRecord) -> Result<Url> {
        let mut url = self.connection_url(credential)?;
        if url.password().is_some() {
            // cannot fail: the URL already carries a password
            let _ = url.set_password(Some("xxxxx"));
        }
        Ok(url)
    }

    /// Driver options built from the record fields.
    ///
    /// The connect timeout is not part of the options; the whole connect
    /// attempt is bounded with `tokio::time::timeout` instead.
    pub fn connect_options(&self, credential: &CredentialRecord) -> Result<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .map_err(|e| Error::config(format!("Invalid Postgres ssl mode: {}", e)))?;

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&credential.host)
            .username(&credential.username)
            .password(credential.password.expose_secret())
            .ssl_mode(ssl_mode);
        if !credential.port.is_empty() {
            let port = credential.port.parse::<u16>().map_err(|_| {
                Error::connection(ENGINE, format!("Invalid port '{}'", credential.port))
            })?;
            options = options.port(port);
        }
        if !credential.database_name.is_empty() {
            options = options.database(&credential.database_name);
        }

        Ok(options.disable_statement_logging())
    }

    async fn connect(&self, credential: &CredentialRecord) -> Result<PgConnection> {
        credential.ensure_connectable()?;
        let target = self.connection_target(credential)?;
        let options = self.connect_options(credential)?;

        debug!(url = %target, "Connecting to Postgres");

        let connect = PgConnection::connect_with(&options);
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(Error::connection(ENGINE, format!("{} ({})", e, target))),
            Err(_) => Err(Error::connection(
                ENGINE,
                format!("Timed out after {}s ({})", self.connect_timeout.as_secs(), target),
            )),
        }
    }
}

/// Double-quoted identifier
pub(crate) fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quoted string literal
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `ALTER USER` statement setting a new password
pub(crate) fn alter_user_statement(username: &str, new_password: &str) -> String {
    format!(
        "ALTER USER {} WITH PASSWORD {}",
        quote_identifier(username),
        quote_literal(new_password)
    )
}

#[async_trait]
impl EngineRotator for PostgresRotator {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    async fn rotate(&self, current: &CredentialRecord, new_password: &SecretString) -> Result<()> {
        if new_password.is_empty() {
            return Err(Error::rotation(ENGINE, "New password is empty"));
        }

        let mut conn = self.connect(current).await?;
        let statement = alter_user_statement(&current.username, new_password.expose_secret());

        let result = conn.execute(statement.as_str()).await;
        // best effort; the password change already committed or failed
        let _ = conn.close().await;

        result.map_err(|e| Error::rotation(ENGINE, e.to_string()))?;
        info!(username = %current.username, host = %current.host, "Changed Postgres password");
        Ok(())
    }

    async fn test(&self, credential: &CredentialRecord) -> Result<()> {
        let mut conn = self.connect(credential).await?;
        let result = conn.ping().await;
        let _ = conn.close().await;

        result.map_err(|e| Error::connection(ENGINE, e.to_string()))?;
        debug!(
            username = %credential.username,
            host = %credential.host,
            "Postgres credentials verified"
        );
        Ok(())
    }
}
