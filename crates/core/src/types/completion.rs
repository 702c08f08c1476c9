//! Profile completion status.

use serde::{Deserialize, Serialize};

/// Completion status of one profile stage (user or seller).
///
/// `Unknown` means the status could not be determined (not fetched yet, no
/// session, or the fetch failed). It is distinct from a verified
/// `Incomplete` so that navigation guards can wait instead of redirecting,
/// but it is never treated as `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    #[default]
    Unknown,
    Incomplete,
    Complete,
}

impl Completion {
    /// Build a verified status from a boolean check.
    #[must_use]
    pub const fn from_verified(complete: bool) -> Self {
        if complete {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }

    /// Whether the stage is verified complete.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether the status is still undetermined.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Complete => write!(f, "complete"),
        }
    }
}
