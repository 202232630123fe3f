//! # Severity Classifier
//! Keyword-lexicon classification of incident text into an ordinal severity.
//!
//! Derived, never stored: callers classify on every read so the label cannot
//! drift from its source text. Total and deterministic; unknown text is `Low`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal severity. Declaration order gives `Low < Medium < High < Critical`
/// for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Lexicons are checked in priority order; the first hit wins. Terms are
/// matched as lowercase substrings of `"{title} {description}"`.
const CRITICAL_TERMS: &[&str] = &[
    "massive",
    "catastrophic",
    "tsunami",
    "hurricane",
    "category 4",
    "major earthquake",
    "hundreds dead",
    "state of emergency",
];

const HIGH_TERMS: &[&str] = &[
    "earthquake",
    "flood",
    "wildfire",
    "cyclone",
    "tornado",
    "landslide",
    "explosion",
    "outbreak",
];

const MEDIUM_TERMS: &[&str] = &["storm", "heavy rain", "evacuation", "accident", "conflict"];

impl Severity {
    /// Classify incident text. Pure; no failure mode.
    pub fn classify(title: &str, description: &str) -> Severity {
        let text = format!("{} {}", title, description).to_lowercase();
        if CRITICAL_TERMS.iter().any(|k| text.contains(k)) {
            return Severity::Critical;
        }
        if HIGH_TERMS.iter().any(|k| text.contains(k)) {
            return Severity::High;
        }
        if MEDIUM_TERMS.iter().any(|k| text.contains(k)) {
            return Severity::Medium;
        }
        Severity::Low
    }

    /// Numeric priority used by the deduplicator sort (Critical=4 .. Low=1).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_lexicon_wins_over_high() {
        // "tsunami" (critical) and "earthquake" (high) both present.
        let s = Severity::classify("Tsunami warning after major earthquake", "");
        assert_eq!(s, Severity::Critical);
    }

    #[test]
    fn match_is_case_insensitive_across_both_fields() {
        assert_eq!(Severity::classify("", "WILDFIRE spreading"), Severity::High);
        assert_eq!(Severity::classify("Heavy Rain expected", ""), Severity::Medium);
    }

    #[test]
    fn no_match_defaults_to_low() {
        assert_eq!(Severity::classify("Routine update", "nothing notable"), Severity::Low);
    }

    #[test]
    fn ordering_matches_rank() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.rank(), 4);
        assert_eq!(Severity::Low.rank(), 1);
    }
}
