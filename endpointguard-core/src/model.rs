//! Shared severity/confidence vocabulary (spec §3).
//!
//! These two enums are used by the config (per-rule severity caps), the
//! waiver/baseline formats, and the engine's findings — keeping them in the
//! shared core crate avoids every consumer re-deriving the same rank table.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Finding severity. Ranks: critical=4 > high=3 > med=2 > low=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Med,
    Low,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Med => 2,
            Severity::Low => 1,
        }
    }

    /// One severity notch upward, capped at `Critical` — used by the
    /// public-intent severity-bump rule (INPUT-VALIDATION-MISSING, spec §4.8).
    pub fn bump(self) -> Severity {
        match self {
            Severity::Low => Severity::Med,
            Severity::Med => Severity::High,
            Severity::High => Severity::High,
            Severity::Critical => Severity::Critical,
        }
    }

    /// Clamp `self` to never exceed `cap`, used for per-rule configured
    /// severity ceilings (spec §4.8, testable property 2).
    pub fn clamp_to(self, cap: Severity) -> Severity {
        if self.rank() > cap.rank() {
            cap
        } else {
            self
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Med => "med",
            Severity::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// Finding confidence. Ranks: high=3 > med=2 > low=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Med,
    Low,
}

impl Confidence {
    pub fn rank(self) -> u8 {
        match self {
            Confidence::High => 3,
            Confidence::Med => 2,
            Confidence::Low => 1,
        }
    }

    /// Confidence-weighted scoring multiplier (spec §4.9: high=1.0, med=0.25, low=0.1).
    pub fn weight(self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::Med => 0.25,
            Confidence::Low => 0.1,
        }
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

impl Ord for Confidence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Med => "med",
            Confidence::Low => "low",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ranks_order_correctly() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Med);
        assert!(Severity::Med > Severity::Low);
    }

    #[test]
    fn bump_caps_at_critical() {
        assert_eq!(Severity::Low.bump(), Severity::Med);
        assert_eq!(Severity::Med.bump(), Severity::High);
        assert_eq!(Severity::High.bump(), Severity::High);
        assert_eq!(Severity::Critical.bump(), Severity::Critical);
    }

    #[test]
    fn clamp_never_exceeds_cap() {
        assert_eq!(Severity::Critical.clamp_to(Severity::High), Severity::High);
        assert_eq!(Severity::Low.clamp_to(Severity::High), Severity::Low);
    }

    #[test]
    fn confidence_weights_match_spec() {
        assert_eq!(Confidence::High.weight(), 1.0);
        assert_eq!(Confidence::Med.weight(), 0.25);
        assert_eq!(Confidence::Low.weight(), 0.1);
    }
}
