//! Secure types for handling database passwords.
//!
//! Passwords move between the secret store and the database engines inside
//! [`SecretString`], which keeps them out of logs and debug output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// # Security
///
/// - Debug output shows `SecretString([REDACTED])` instead of the actual value
/// - Display output shows `[REDACTED]`
/// - Plain serialization outputs `"[REDACTED]"`; the credential payload opts
///   into the real value field by field with [`serialize_exposed`]
/// - Deserialization accepts actual secret values
/// - Memory is zeroed when dropped (via `zeroize`)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(SecretString(value))
    }
}

/// Serialize the real value of a [`SecretString`] field.
///
/// For use with `#[serde(serialize_with = "serialize_exposed")]` on payloads
/// that are written to the secret store and nowhere else.
pub fn serialize_exposed<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// Only for building connection options, SQL statements and store
    /// payloads. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Default for SecretString {
    fn default() -> Self {
        Self::new("")
    }
}
