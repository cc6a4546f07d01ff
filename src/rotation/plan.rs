//! Pure step decisions over a stage snapshot.

use crate::domain::{VersionId, VersionStage};
use crate::errors::{Error, Result};
use crate::secrets::StageSnapshot;

/// What `finishSecret` should do for a given stage layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishPlan {
    /// The token's version already holds CURRENT
    AlreadyCurrent { version_id: VersionId },
    /// Move CURRENT from `from` to `to`
    Promote { from: VersionId, to: VersionId },
}

/// Decide how to finish a rotation.
///
/// CURRENT is compared against the token before PENDING is resolved, so a
/// retry after a successful promotion succeeds even once the store has
/// cleared PENDING.
///
/// # Errors
///
/// - `NotFound` if no version holds CURRENT, or a promotion is needed and
///   no version holds PENDING
pub fn plan_finish(snapshot: &StageSnapshot, secret_id: &str, token: &str) -> Result<FinishPlan> {
    let current = snapshot
        .version_for(VersionStage::Current)
        .ok_or_else(|| Error::not_found(secret_id, VersionStage::Current))?;

    if current.as_str() == token {
        return Ok(FinishPlan::AlreadyCurrent { version_id: current.clone() });
    }

    let pending = snapshot
        .version_for(VersionStage::Pending)
        .ok_or_else(|| Error::not_found(secret_id, VersionStage::Pending))?;

    if pending == current {
        return Ok(FinishPlan::AlreadyCurrent { version_id: current.clone() });
    }

    Ok(FinishPlan::Promote { from: current.clone(), to: pending.clone() })
}
