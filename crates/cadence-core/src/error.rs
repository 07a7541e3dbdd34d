//! Typed errors for the planning core.
//!
//! Two tiers, mirroring the propagation policy of the engine:
//!
//! - [`InputError`] — snapshot validation failures raised *before* a run
//!   starts. These reach the caller.
//! - [`CapacityError`] — a ledger contract violation. `allocate` never
//!   over-reserves, so this surfacing mid-run means a bug, not bad input.
//!
//! Per-item problems encountered *during* a run (missing estimates, missing
//! roles, flagged work) are not errors at all — they degrade to warnings in
//! the plan result.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger contract violation inside a capacity tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A reservation asked for more hours than the date has left.
    #[error(
        "capacity exceeded for {account_id} on {date}: requested {requested}h, available {available}h"
    )]
    Exceeded {
        account_id: String,
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
    },
}

/// Snapshot validation failure raised before a planning run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("team member with empty account id")]
    EmptyAccountId,

    #[error("duplicate account id in roster: {account_id}")]
    DuplicateAccountId { account_id: String },

    #[error("negative hours-per-day for {account_id}: {hours}")]
    NegativeHoursPerDay { account_id: String, hours: Decimal },

    #[error("negative phase hours on story {key}")]
    NegativePhaseHours { key: String },

    #[error("negative risk buffer: {value}")]
    NegativeRiskBuffer { value: Decimal },

    #[error("negative rough-estimate hours in config")]
    NegativeRoughEstimate,
}
