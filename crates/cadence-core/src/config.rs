//! Planning configuration.
//!
//! Supplied by the caller alongside the snapshot; the engine never reads
//! config from disk itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::model::PhaseHours;

/// Tunables for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Multiplicative safety margin applied to every estimated phase:
    /// `hours × (1 + risk_buffer)`. Default `0.2` (20%).
    #[serde(default = "default_risk_buffer")]
    pub risk_buffer: Decimal,
    /// Epic-level fallback split used when a `Planned` epic's story carries
    /// no subtask-derived hours.
    #[serde(default)]
    pub rough_estimate: RoughEstimate,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            risk_buffer: default_risk_buffer(),
            rough_estimate: RoughEstimate::default(),
        }
    }
}

impl PlanConfig {
    /// Validate the tunables before a run starts.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] when the risk buffer or any rough-estimate
    /// component is negative.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.risk_buffer < Decimal::ZERO {
            return Err(InputError::NegativeRiskBuffer {
                value: self.risk_buffer,
            });
        }
        self.rough_estimate.validate()
    }
}

fn default_risk_buffer() -> Decimal {
    // 20%
    Decimal::new(2, 1)
}

/// Rough per-phase hour split for stories without subtask estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoughEstimate {
    #[serde(default = "default_sa_hours")]
    pub sa_hours: Decimal,
    #[serde(default = "default_dev_hours")]
    pub dev_hours: Decimal,
    #[serde(default = "default_qa_hours")]
    pub qa_hours: Decimal,
}

impl Default for RoughEstimate {
    fn default() -> Self {
        Self {
            sa_hours: default_sa_hours(),
            dev_hours: default_dev_hours(),
            qa_hours: default_qa_hours(),
        }
    }
}

impl RoughEstimate {
    /// The split as a phase-hour triple.
    #[must_use]
    pub const fn as_phase_hours(&self) -> PhaseHours {
        PhaseHours {
            sa: self.sa_hours,
            dev: self.dev_hours,
            qa: self.qa_hours,
        }
    }

    fn validate(&self) -> Result<(), InputError> {
        if self.sa_hours < Decimal::ZERO
            || self.dev_hours < Decimal::ZERO
            || self.qa_hours < Decimal::ZERO
        {
            return Err(InputError::NegativeRoughEstimate);
        }
        Ok(())
    }
}

fn default_sa_hours() -> Decimal {
    Decimal::from(8)
}

fn default_dev_hours() -> Decimal {
    Decimal::from(24)
}

fn default_qa_hours() -> Decimal {
    Decimal::from(8)
}
