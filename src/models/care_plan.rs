//! Care plan output types.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity classification attached to every care plan.
///
/// Variants are declared in ascending severity, so `Ord` ranks
/// `Routine < Urgent < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLevel {
    /// Stable presentation; schedule routine follow-up.
    Routine,
    /// Needs prompt clinical evaluation.
    Urgent,
    /// Needs immediate escalation.
    Emergency,
}

impl TriageLevel {
    /// All levels in ascending severity.
    pub const ALL: [Self; 3] = [Self::Routine, Self::Urgent, Self::Emergency];

    /// Returns the wire name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "routine" => Ok(Self::Routine),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            other => Err(Error::InvalidInput(format!("unknown triage level '{other}'"))),
        }
    }
}

/// A generated care plan. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarePlan {
    summary: String,
    suggested_tests: Vec<String>,
    triage_level: TriageLevel,
}

impl CarePlan {
    /// Creates a care plan. Duplicate tests are dropped, keeping first occurrences in order.
    #[must_use]
    pub fn new(
        summary: impl Into<String>,
        suggested_tests: impl IntoIterator<Item = String>,
        triage_level: TriageLevel,
    ) -> Self {
        let mut tests: Vec<String> = Vec::new();
        for test in suggested_tests {
            if !tests.contains(&test) {
                tests.push(test);
            }
        }
        Self {
            summary: summary.into(),
            suggested_tests: tests,
            triage_level,
        }
    }

    /// Narrative summary.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Suggested diagnostic tests, without duplicates.
    #[must_use]
    pub fn suggested_tests(&self) -> &[String] {
        &self.suggested_tests
    }

    /// Triage level.
    #[must_use]
    pub const fn triage_level(&self) -> TriageLevel {
        self.triage_level
    }
}
