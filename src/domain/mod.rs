//! Domain layer
//!
//! Plain data types shared by the store gateway, the engine rotators and
//! the rotation state machine. Nothing here performs I/O.
//!
//! ## Module Organization
//!
//! - `credential`: the credential record persisted as the secret value
//! - `id`: store-assigned version identifiers
//! - `stage`: version stage labels (`AWSCURRENT`, `AWSPENDING`, `AWSPREVIOUS`)
//! - `step`: rotation steps and the scheduler request

pub mod credential;
pub mod id;
pub mod stage;
pub mod step;

pub use credential::CredentialRecord;
pub use id::VersionId;
pub use stage::VersionStage;
pub use step::{RotationRequest, RotationStep};
