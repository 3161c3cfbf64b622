//! Agent-submitted work outcomes and their validation rules.

use super::{LeadStatus, PotentialLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which action the agent took on the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    /// The agent spoke with the contact.
    Contacted,
    /// The agent booked an appointment.
    Appointment,
}

impl OutcomeAction {
    /// Returns the status the lead moves to when this action is committed.
    #[must_use]
    pub const fn target_status(self) -> LeadStatus {
        match self {
            Self::Contacted => LeadStatus::Contacted,
            Self::Appointment => LeadStatus::Appointment,
        }
    }
}

/// Outcome submitted by an agent for the lead it currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    action: OutcomeAction,
    notes: String,
    potential_level: Option<PotentialLevel>,
    recording_ref: Option<String>,
}

impl CommitOutcome {
    /// Creates an outcome with the mandatory action and annotation.
    #[must_use]
    pub fn new(action: OutcomeAction, notes: impl Into<String>) -> Self {
        Self {
            action,
            notes: notes.into(),
            potential_level: None,
            recording_ref: None,
        }
    }

    /// Sets the potential classification.
    #[must_use]
    pub const fn with_potential_level(mut self, level: PotentialLevel) -> Self {
        self.potential_level = Some(level);
        self
    }

    /// Attaches a call recording reference.
    #[must_use]
    pub fn with_recording_ref(mut self, recording_ref: impl Into<String>) -> Self {
        self.recording_ref = Some(recording_ref.into());
        self
    }

    /// Returns the submitted action.
    #[must_use]
    pub const fn action(&self) -> OutcomeAction {
        self.action
    }

    /// Checks the submission rules and returns the normalized outcome.
    ///
    /// Notes are trimmed and measured in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CommitValidationError::NoteTooShort`] when the trimmed note
    /// has fewer than `min_note_chars` characters, or
    /// [`CommitValidationError::MissingPotentialLevel`] when no potential
    /// level was set. The note rule is checked first.
    pub fn validate(self, min_note_chars: usize) -> Result<ValidatedOutcome, CommitValidationError> {
        let notes = self.notes.trim();
        let actual = notes.chars().count();
        if actual < min_note_chars {
            return Err(CommitValidationError::NoteTooShort {
                actual,
                minimum: min_note_chars,
            });
        }
        let Some(potential_level) = self.potential_level else {
            return Err(CommitValidationError::MissingPotentialLevel);
        };
        let recording_ref = self
            .recording_ref
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(ValidatedOutcome {
            action: self.action,
            notes: notes.to_owned(),
            potential_level,
            recording_ref,
        })
    }
}

/// Outcome that passed validation and may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOutcome {
    action: OutcomeAction,
    notes: String,
    potential_level: PotentialLevel,
    recording_ref: Option<String>,
}

impl ValidatedOutcome {
    /// Returns the submitted action.
    #[must_use]
    pub const fn action(&self) -> OutcomeAction {
        self.action
    }

    /// Returns the status the lead moves to.
    #[must_use]
    pub const fn target_status(&self) -> LeadStatus {
        self.action.target_status()
    }

    /// Returns the trimmed annotation.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Returns the potential classification.
    #[must_use]
    pub const fn potential_level(&self) -> PotentialLevel {
        self.potential_level
    }

    /// Returns the call recording reference, if any.
    #[must_use]
    pub fn recording_ref(&self) -> Option<&str> {
        self.recording_ref.as_deref()
    }
}

/// Submission rule an outcome failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitValidationError {
    /// The annotation is shorter than the configured minimum.
    #[error("note has {actual} characters, at least {minimum} are required")]
    NoteTooShort {
        /// Trimmed character count of the submitted note.
        actual: usize,
        /// Configured minimum.
        minimum: usize,
    },

    /// No potential classification was chosen.
    #[error("a potential level must be selected before submitting")]
    MissingPotentialLevel,
}
