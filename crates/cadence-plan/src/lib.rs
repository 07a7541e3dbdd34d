#![forbid(unsafe_code)]
//! cadence-plan library.
//!
//! Dependency resolution and the planning-engine orchestrator: orders
//! epics and stories, runs each story's SA→DEV→QA pipeline against the
//! per-assignee capacity ledgers from `cadence-core`, and aggregates the
//! immutable plan result.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` with context at the orchestration
//!   boundary; typed errors stay in `cadence-core`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod engine;
pub mod report;
pub mod resolve;

pub use engine::{PlanSnapshot, PlanningEngine};
pub use report::PlanResult;
