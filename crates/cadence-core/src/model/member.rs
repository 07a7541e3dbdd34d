use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three delivery roles, matching the three story phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sa,
    Dev,
    Qa,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sa => "sa",
            Self::Dev => "dev",
            Self::Qa => "qa",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of the team roster.
///
/// `hours_per_day` is the *effective* daily capacity — already
/// grade-adjusted by the caller (e.g. 8h × 0.8 grade coefficient = 6.4h).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub account_id: String,
    pub display_name: String,
    pub role: Role,
    pub hours_per_day: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}
