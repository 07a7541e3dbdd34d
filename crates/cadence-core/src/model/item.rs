use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::model::member::Role;
use crate::round2;

/// The three story phases, in strict pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Sa,
    Dev,
    Qa,
}

impl Phase {
    /// Pipeline order: analysis, then development, then testing.
    pub const ALL: [Self; 3] = [Self::Sa, Self::Dev, Self::Qa];

    /// The roster role that performs this phase.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Sa => Role::Sa,
            Self::Dev => Role::Dev,
            Self::Qa => Role::Qa,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sa => "sa",
            Self::Dev => "dev",
            Self::Qa => "qa",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work-item lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    New,
    Planned,
    InProgress,
    Done,
}

impl Status {
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Done items never enter a schedule; everything else is plannable.
    #[must_use]
    pub const fn is_plannable(self) -> bool {
        !self.is_done()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Planned => "planned",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining work hours per phase for one story.
///
/// Derived externally from subtask remaining estimates; the engine only
/// consumes the triple. Immutable — buffering produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseHours {
    pub sa: Decimal,
    pub dev: Decimal,
    pub qa: Decimal,
}

impl PhaseHours {
    /// Build a triple, rejecting negative components.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NegativePhaseHours`] when any component is
    /// negative. `key` identifies the offending story in the error.
    pub fn new(sa: Decimal, dev: Decimal, qa: Decimal, key: &str) -> Result<Self, InputError> {
        if sa < Decimal::ZERO || dev < Decimal::ZERO || qa < Decimal::ZERO {
            return Err(InputError::NegativePhaseHours {
                key: key.to_string(),
            });
        }
        Ok(Self { sa, dev, qa })
    }

    #[must_use]
    pub const fn get(self, phase: Phase) -> Decimal {
        match phase {
            Phase::Sa => self.sa,
            Phase::Dev => self.dev,
            Phase::Qa => self.qa,
        }
    }

    /// `true` when all three phases are zero (no estimate at all).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.sa <= Decimal::ZERO && self.dev <= Decimal::ZERO && self.qa <= Decimal::ZERO
    }

    #[must_use]
    pub fn total(self) -> Decimal {
        self.sa + self.dev + self.qa
    }

    /// Apply a multiplicative risk buffer to every phase.
    ///
    /// Each component becomes `hours × (1 + risk_buffer)` rounded half-up
    /// to two decimal places (e.g. 4h with a 20% buffer → 4.8h).
    #[must_use]
    pub fn buffered(self, risk_buffer: Decimal) -> Self {
        let factor = Decimal::ONE + risk_buffer;
        Self {
            sa: round2(self.sa * factor),
            dev: round2(self.dev * factor),
            qa: round2(self.qa * factor),
        }
    }
}

/// Top-level work item grouping stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub key: String,
    pub priority_score: Decimal,
    pub status: Status,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Unit of schedulable work, reduced to three phase-hour totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub key: String,
    pub epic_key: String,
    pub priority_score: Decimal,
    pub status: Status,
    /// Work explicitly paused — excluded from scheduling with a warning.
    #[serde(default)]
    pub flagged: bool,
    /// Keys of stories that must fully complete before this one starts.
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub hours: PhaseHours,
    /// Progress pass-through: seconds already logged against this story.
    #[serde(default)]
    pub logged_seconds: u64,
    /// Progress pass-through: originally estimated seconds.
    #[serde(default)]
    pub estimate_seconds: u64,
}
