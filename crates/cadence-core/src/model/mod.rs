//! Work-item and roster model consumed by the planning engine.
//!
//! All entities here are constructed fresh per planning run from the
//! caller's snapshot; nothing persists across runs.

pub mod item;
pub mod member;

pub use item::{Epic, Phase, PhaseHours, Status, Story};
pub use member::{Role, TeamMember};
