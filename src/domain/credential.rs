//! Database credential record stored as a secret value.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::secrets::types::{serialize_exposed, SecretString};

/// Credentials for one database login, as persisted in the secret store.
///
/// The stored payload is a flat JSON object with the keys `dbname`,
/// `engine`, `host`, `instance`, `password`, `port` and `username`, all
/// string-typed. Provisioning tooling writes the same shape, so the field
/// names are part of the persisted contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRecord {
    #[serde(rename = "dbname")]
    pub database_name: String,

    /// Engine identifier resolved through the rotator registry
    pub engine: String,

    pub host: String,

    /// Named instance (SQL Server); empty when unused
    pub instance: String,

    #[serde(serialize_with = "serialize_exposed")]
    pub password: SecretString,

    pub port: String,

    pub username: String,
}

impl CredentialRecord {
    /// Parse a stored payload
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(Error::decode)
    }

    /// Encode for storage; the password is written in clear
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    /// A copy of this record carrying a different password
    pub fn with_password(&self, password: SecretString) -> Self {
        Self { password, ..self.clone() }
    }

    /// Check the record can be used to open a connection
    pub fn ensure_connectable(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(Error::decode_message(format!(
                "credentials for user '{}' have an empty password",
                self.username
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CredentialRecord {
        CredentialRecord {
            database_name: "orders".to_string(),
            engine: "postgres".to_string(),
            host: "db.internal".to_string(),
            instance: String::new(),
            password: SecretString::new("old-password"),
            port: "5432".to_string(),
            username: "app".to_string(),
        }
    }

    #[test]
    fn test_payload_uses_store_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["dbname"], "orders");
        assert_eq!(value["engine"], "postgres");
        assert_eq!(value["password"], "old-password");
        assert_eq!(value["port"], "5432");
        assert_eq!(value.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_decode_payload() {
        let payload = r#"{"dbname":"orders","engine":"sqlserver","host":"mssql","instance":"SQLEXPRESS","password":"pw","port":"","username":"sa"}"#;
        let record = CredentialRecord::from_json(payload).unwrap();

        assert_eq!(record.engine, "sqlserver");
        assert_eq!(record.instance, "SQLEXPRESS");
        assert_eq!(record.password.expose_secret(), "pw");
    }

    #[test]
    fn test_decode_tolerates_missing_and_extra_keys() {
        let record =
            CredentialRecord::from_json(r#"{"engine":"postgres","masterarn":"x"}"#).unwrap();
        assert_eq!(record.engine, "postgres");
        assert!(record.password.is_empty());
    }

    #[test]
    fn test_decode_rejects_non_string_fields() {
        let err = CredentialRecord::from_json(r#"{"port": 5432}"#).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Decode);

        let err = CredentialRecord::from_json("not json").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Decode);
    }

    #[test]
    fn test_with_password_changes_only_password() {
        let current = sample();
        let pending = current.with_password(SecretString::new("new-password"));

        assert_eq!(pending.password.expose_secret(), "new-password");
        assert_eq!(pending.username, current.username);
        assert_eq!(pending.host, current.host);
        assert_ne!(pending, current);
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("old-password"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_empty_password_is_not_connectable() {
        let record = sample().with_password(SecretString::default());
        assert!(record.ensure_connectable().is_err());
        assert!(sample().ensure_connectable().is_ok());
    }
}
