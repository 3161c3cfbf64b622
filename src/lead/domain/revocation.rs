//! Manager override modes.

use serde::{Deserialize, Serialize};

/// How far a manager revocation unwinds an agent's pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationMode {
    /// Clear the lease; the lead stays assigned to the agent.
    Unlock,
    /// Clear the lease and the assignment, returning the lead to the
    /// unassigned pool.
    UnassignAndUnlock,
}

impl RevocationMode {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unlock => "unlock",
            Self::UnassignAndUnlock => "unassign_and_unlock",
        }
    }
}
