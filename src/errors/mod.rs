//! # Error Handling
//!
//! Error taxonomy for the rotation core, built with `thiserror`.
//!
//! Every failure a rotation step can produce maps onto one [`ErrorKind`].
//! Step handlers wrap the underlying error with [`Error::in_step`] so logs
//! carry the step and secret id, while [`Error::kind`] still reports the
//! underlying category.

use std::fmt;

use crate::domain::{RotationStep, VersionStage};

/// Custom result type for rotation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rotation core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Secret missing, no version holds the stage, or the version has no value
    #[error("Secret '{secret_id}' not found{}", stage_suffix(.stage))]
    NotFound { secret_id: String, stage: Option<VersionStage> },

    /// Stored payload does not parse into the credential shape
    #[error("Could not decode credentials: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Credential record could not be serialized for the store
    #[error("Could not encode credentials: {0}")]
    Encode(#[source] serde_json::Error),

    /// Engine identifier not present in the registry
    #[error("Unsupported database engine: {engine}")]
    UnsupportedEngine { engine: String },

    /// Database connection could not be established
    #[error("Could not connect to {engine} database: {message}")]
    Connection { engine: String, message: String },

    /// Password-change statement was rejected by the engine
    #[error("Could not change password on {engine} database: {message}")]
    Rotation { engine: String, message: String },

    /// Stage move or versioned write rejected by the store
    #[error("Secret store conflict: {message}")]
    StoreConflict { message: String },

    /// Any other secret store failure
    #[error("Secret store error: {message}")]
    Upstream { message: String },

    /// Calling context was cancelled before the step completed
    #[error("Rotation step cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Error raised while running a rotation step
    #[error("({step}) secret '{secret_id}': {source}")]
    Step {
        step: RotationStep,
        secret_id: String,
        #[source]
        source: Box<Error>,
    },
}

fn stage_suffix(stage: &Option<VersionStage>) -> String {
    stage.map(|s| format!(" at stage {}", s)).unwrap_or_default()
}

/// Error category, independent of step context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Decode,
    Encode,
    UnsupportedEngine,
    Connection,
    Rotation,
    StoreConflict,
    Upstream,
    Cancelled,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Decode => "decode",
            Self::Encode => "encode",
            Self::UnsupportedEngine => "unsupported_engine",
            Self::Connection => "connection",
            Self::Rotation => "rotation",
            Self::StoreConflict => "store_conflict",
            Self::Upstream => "upstream",
            Self::Cancelled => "cancelled",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a not found error for a stage of a secret
    pub fn not_found(secret_id: impl Into<String>, stage: VersionStage) -> Self {
        Self::NotFound { secret_id: secret_id.into(), stage: Some(stage) }
    }

    /// Create a not found error for a whole secret
    pub fn secret_not_found(secret_id: impl Into<String>) -> Self {
        Self::NotFound { secret_id: secret_id.into(), stage: None }
    }

    /// Create a decode error from a JSON failure
    pub fn decode(source: serde_json::Error) -> Self {
        Self::Decode { message: source.to_string(), source: Some(source) }
    }

    /// Create a decode error without an underlying JSON error
    pub fn decode_message(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into(), source: None }
    }

    /// Create an unsupported engine error
    pub fn unsupported_engine(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngine { engine: engine.into() }
    }

    /// Create a connection error
    pub fn connection(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection { engine: engine.into(), message: message.into() }
    }

    /// Create a rotation error
    pub fn rotation(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rotation { engine: engine.into(), message: message.into() }
    }

    /// Create a store conflict error
    pub fn store_conflict(message: impl Into<String>) -> Self {
        Self::StoreConflict { message: message.into() }
    }

    /// Create an upstream store error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Attach step context. An error that already carries step context is
    /// returned unchanged.
    pub fn in_step(self, step: RotationStep, secret_id: impl Into<String>) -> Self {
        if matches!(self, Self::Step { .. }) {
            return self;
        }
        Self::Step { step, secret_id: secret_id.into(), source: Box::new(self) }
    }

    /// The error category, looking through step context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Encode(_) => ErrorKind::Encode,
            Self::UnsupportedEngine { .. } => ErrorKind::UnsupportedEngine,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Rotation { .. } => ErrorKind::Rotation,
            Self::StoreConflict { .. } => ErrorKind::StoreConflict,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config { .. } => ErrorKind::Config,
            Self::Step { source, .. } => source.kind(),
        }
    }

    /// The step this error was raised in, if any
    pub fn step(&self) -> Option<RotationStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Check if re-invoking the same step later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection
                | ErrorKind::Upstream
                | ErrorKind::StoreConflict
                | ErrorKind::Cancelled
        )
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_validation_messages("", &errors, &mut fields);
        fields.sort();

        Self::config(format!("Validation failed: {}", fields.join("; ")))
    }
}

/// Flatten nested validation errors into `path: message` entries
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = Error::not_found("db/app", VersionStage::Pending);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Secret 'db/app' not found at stage AWSPENDING");

        let err = Error::secret_not_found("db/app");
        assert_eq!(err.to_string(), "Secret 'db/app' not found");

        let err = Error::unsupported_engine("oracle");
        assert_eq!(err.kind(), ErrorKind::UnsupportedEngine);
        assert_eq!(err.to_string(), "Unsupported database engine: oracle");

        let err = Error::connection("postgres", "timed out");
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_step_context_preserves_kind() {
        let err = Error::store_conflict("stage moved")
            .in_step(RotationStep::FinishSecret, "db/app");

        assert_eq!(err.kind(), ErrorKind::StoreConflict);
        assert_eq!(err.step(), Some(RotationStep::FinishSecret));
        assert_eq!(
            err.to_string(),
            "(finishSecret) secret 'db/app': Secret store conflict: stage moved"
        );
    }

    #[test]
    fn test_step_context_is_not_nested() {
        let err = Error::Cancelled
            .in_step(RotationStep::SetSecret, "a")
            .in_step(RotationStep::TestSecret, "b");

        assert_eq!(err.step(), Some(RotationStep::SetSecret));
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_decode_keeps_json_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::decode(json_error);

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(Error::connection("sqlserver", "refused").is_retryable());
        assert!(Error::upstream("throttled").is_retryable());
        assert!(!Error::unsupported_engine("oracle").is_retryable());
        assert!(!Error::decode_message("empty").is_retryable());
        assert!(!Error::rotation("postgres", "permission denied").is_retryable());
    }

    #[test]
    fn test_nested_validation_messages() {
        use validator::Validate;

        #[derive(Validate)]
        struct Inner {
            #[validate(range(min = 1, message = "must be positive"))]
            timeout: u64,
        }

        #[derive(Validate)]
        struct Outer {
            #[validate(nested)]
            inner: Inner,
        }

        let err = Error::from(Outer { inner: Inner { timeout: 0 } }.validate().unwrap_err());
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(
            err.to_string(),
            "Configuration error: Validation failed: inner.timeout: must be positive"
        );
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::StoreConflict.to_string(), "store_conflict");
        assert_eq!(ErrorKind::UnsupportedEngine.to_string(), "unsupported_engine");
    }
}
