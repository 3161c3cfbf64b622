//! Lead lifecycle status and outcome classifications.

use super::{ParseLeadStatusError, ParsePotentialLevelError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Waiting to be worked. The only leasable status.
    Pending,
    /// The agent reached the contact.
    Contacted,
    /// The agent booked an appointment.
    Appointment,
    /// The sale or engagement has been closed.
    Completed,
    /// The contact declined.
    Rejected,
    /// The contact could not be reached.
    Unreachable,
}

impl LeadStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Appointment => "appointment",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Unreachable => "unreachable",
        }
    }

    /// Returns `true` when leads in this status may be leased.
    #[must_use]
    pub const fn is_leasable(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LeadStatus {
    type Error = ParseLeadStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "contacted" => Ok(Self::Contacted),
            "appointment" => Ok(Self::Appointment),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "unreachable" => Ok(Self::Unreachable),
            _ => Err(ParseLeadStatusError(value.to_owned())),
        }
    }
}

/// Agent's estimate of how promising a worked lead is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialLevel {
    /// Unlikely to convert.
    Low,
    /// Could go either way.
    Medium,
    /// Likely to convert.
    High,
}

impl PotentialLevel {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for PotentialLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PotentialLevel {
    type Error = ParsePotentialLevelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParsePotentialLevelError(value.to_owned())),
        }
    }
}
