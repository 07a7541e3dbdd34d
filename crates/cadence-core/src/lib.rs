#![forbid(unsafe_code)]
//! cadence-core library.
//!
//! Work-item model, the [`calendar::WorkCalendar`] capability, and the
//! per-assignee capacity ledger consumed by the planning engine.
//!
//! # Conventions
//!
//! - **Errors**: typed errors in [`error`]; `anyhow::Result` belongs to the
//!   orchestration layer, not here.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//! - **Hours**: every hour quantity is a [`rust_decimal::Decimal`], rounded
//!   half-up to two decimal places at each arithmetic step via [`round2`].

pub mod calendar;
pub mod capacity;
pub mod config;
pub mod error;
pub mod model;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round an hour quantity half-up to two decimal places.
///
/// Fractional hours are routine (7.5h/day grade-adjusted capacity, risk
/// buffers like ×1.2), so every arithmetic step re-rounds to keep ledgers
/// and schedules free of accumulated sub-cent noise.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
