//! Version stage labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage label attached to a secret version.
///
/// At most one version carries each stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VersionStage {
    /// The credential active in production
    #[serde(rename = "AWSCURRENT")]
    Current,
    /// Candidate credential awaiting verification and promotion
    #[serde(rename = "AWSPENDING")]
    Pending,
    /// The credential that was current before the last promotion
    #[serde(rename = "AWSPREVIOUS")]
    Previous,
}

impl VersionStage {
    /// Store label for this stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "AWSCURRENT",
            Self::Pending => "AWSPENDING",
            Self::Previous => "AWSPREVIOUS",
        }
    }
}

impl FromStr for VersionStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWSCURRENT" => Ok(Self::Current),
            "AWSPENDING" => Ok(Self::Pending),
            "AWSPREVIOUS" => Ok(Self::Previous),
            _ => Err(format!("Unknown version stage: {}", s)),
        }
    }
}

impl fmt::Display for VersionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
