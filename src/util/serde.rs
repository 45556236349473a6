//! Serializable scheduling primitives shared across modules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque task identifier. Generated as a UUID v4 string unless the caller
/// supplies one at admission.
pub type TaskId = String;

/// Scheduling priority. Ordering is ascending by urgency: `Immediate` sorts
/// first and `Low` sorts last.
///
/// `Retry` sits between `High` and `Normal` so a retried task overtakes
/// ordinary new work without jumping ahead of explicitly urgent work.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Run before anything else.
    Immediate,
    /// Explicitly urgent work.
    High,
    /// Work re-queued after a failed attempt.
    Retry,
    /// Ordinary work.
    #[default]
    Normal,
    /// Background work; eligible for aging.
    Low,
}

impl Priority {
    /// All priorities from most to least urgent.
    pub const ALL: [Self; 5] = [
        Self::Immediate,
        Self::High,
        Self::Retry,
        Self::Normal,
        Self::Low,
    ];

    /// Lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::High => "high",
            Self::Retry => "retry",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Whether `self` is strictly more urgent than `other`.
    #[must_use]
    pub fn is_more_urgent_than(self, other: Self) -> bool {
        self < other
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "high" => Ok(Self::High),
            "retry" => Ok(Self::Retry),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}
