//! Immutable plan outputs.
//!
//! Everything here is computed once per run and never mutated afterward.
//! All types are serde-serializable so callers can render the result as
//! JSON without a conversion layer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cadence_core::model::{Phase, Role};

/// Who a phase was scheduled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub account_id: String,
    pub display_name: String,
}

/// Schedule of one phase of one story.
///
/// `start`/`end` are `None` exactly when `no_capacity` is set (no roster
/// member with the required role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    pub phase: Phase,
    pub assignee: Option<Assignee>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub hours: Decimal,
    pub no_capacity: bool,
}

/// One story's scheduled pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStory {
    pub key: String,
    /// Phases with positive hours, in pipeline order.
    pub phases: Vec<PhaseSchedule>,
    /// First scheduled phase's start.
    pub start: Option<NaiveDate>,
    /// Last scheduled phase's end.
    pub end: Option<NaiveDate>,
    /// This story's warnings, echoed from the flat result list.
    pub warnings: Vec<Warning>,
}

/// Per-role hour and date-range aggregation over one epic's stories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAggregate {
    pub role: Role,
    pub hours: Decimal,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// One epic's aggregated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEpic {
    pub key: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// One entry per role, in pipeline order.
    pub roles: Vec<RoleAggregate>,
    pub stories: Vec<PlannedStory>,
    /// Progress pass-through: summed over the epic's stories.
    pub logged_seconds: u64,
    pub estimate_seconds: u64,
    /// `logged / estimate` as a percentage, 0 when nothing is estimated.
    pub progress_pct: Decimal,
}

/// Why a story or phase could not be scheduled normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    NoEstimate,
    NoCapacity,
    Flagged,
}

/// A recoverable per-item problem surfaced in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub issue_key: String,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    #[must_use]
    pub fn no_estimate(issue_key: &str) -> Self {
        Self {
            issue_key: issue_key.to_string(),
            kind: WarningKind::NoEstimate,
            message: format!("{issue_key}: no remaining hours in any phase, left unscheduled"),
        }
    }

    #[must_use]
    pub fn no_capacity(issue_key: &str, role: Role) -> Self {
        Self {
            issue_key: issue_key.to_string(),
            kind: WarningKind::NoCapacity,
            message: format!("{issue_key}: no active {role} on the roster"),
        }
    }

    #[must_use]
    pub fn flagged(issue_key: &str) -> Self {
        Self {
            issue_key: issue_key.to_string(),
            kind: WarningKind::Flagged,
            message: format!("{issue_key}: flagged (work paused), excluded from schedule"),
        }
    }
}

/// Final tracker state for one assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeUtilization {
    pub account_id: String,
    pub display_name: String,
    pub role: Role,
    pub total_hours: Decimal,
    pub daily_load: BTreeMap<NaiveDate, Decimal>,
}

/// The complete result of one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Epics in planning (priority) order.
    pub epics: Vec<PlannedEpic>,
    pub warnings: Vec<Warning>,
    /// Sorted by account id.
    pub utilization: Vec<AssigneeUtilization>,
}
