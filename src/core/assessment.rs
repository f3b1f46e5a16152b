//! Assessment records and the risk flags raised against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GuidanceError, Result};

/// A learner's stated financial position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialConstraint {
    /// The learner indicated they cannot afford tertiary study.
    CannotAfford,
    /// The learner will need a bursary or loan.
    NeedsFunding,
    /// No financial constraint indicated.
    NoConstraint,
}

/// One scored career match from an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerMatch {
    /// Career identifier.
    #[serde(default)]
    pub career_code: String,
    /// Match score (higher is better).
    pub score: f64,
    /// Estimated study cost, if the assessment subsystem attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
}

impl CareerMatch {
    /// Create a new match.
    pub fn new(career_code: impl Into<String>, score: f64) -> Self {
        Self {
            career_code: career_code.into(),
            score,
            cost_estimate: None,
        }
    }

    /// Attach a cost estimate.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost_estimate = Some(cost);
        self
    }
}

/// A completed (or in-flight) assessment record.
///
/// Every field is optional on the wire: the risk calculator runs on partial
/// records and simply skips rules whose inputs are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    /// Minutes taken to complete the assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time_minutes: Option<f64>,
    /// When the learner started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the learner finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Career matches, sorted by score descending by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_matches: Option<Vec<CareerMatch>>,
    /// Stated financial constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_constraint: Option<FinancialConstraint>,
    /// Raw answers keyed by question ID.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, serde_json::Value>,
}

impl AssessmentRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the completion time in minutes.
    pub fn with_completion_minutes(mut self, minutes: f64) -> Self {
        self.completion_time_minutes = Some(minutes);
        self
    }

    /// Set the career matches.
    pub fn with_matches(mut self, matches: Vec<CareerMatch>) -> Self {
        self.career_matches = Some(matches);
        self
    }

    /// Set the financial constraint.
    pub fn with_financial_constraint(mut self, constraint: FinancialConstraint) -> Self {
        self.financial_constraint = Some(constraint);
        self
    }

    /// Career matches, treating a missing list as empty.
    pub fn career_matches(&self) -> &[CareerMatch] {
        self.career_matches.as_deref().unwrap_or(&[])
    }

    /// Completion time in minutes.
    ///
    /// Uses the explicit value when present, otherwise derives it from the
    /// start and completion timestamps.
    pub fn completion_minutes(&self) -> Option<f64> {
        if let Some(minutes) = self.completion_time_minutes {
            return Some(minutes);
        }
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds() as f64 / 60.0),
            _ => None,
        }
    }

    /// Reject records whose numbers cannot be meaningful.
    pub fn validate(&self) -> Result<()> {
        if let Some(minutes) = self.completion_time_minutes {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(GuidanceError::invalid_input(format!(
                    "completion time must be a non-negative number of minutes (got {})",
                    minutes
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            if end < start {
                return Err(GuidanceError::invalid_input(
                    "assessment completed before it started",
                ));
            }
        }

        for (i, m) in self.career_matches().iter().enumerate() {
            if !m.score.is_finite() {
                return Err(GuidanceError::invalid_input(format!(
                    "career match {} has a non-finite score",
                    i
                )));
            }
            if let Some(cost) = m.cost_estimate {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(GuidanceError::invalid_input(format!(
                        "career match {} has an invalid cost estimate",
                        i
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Severity of a risk flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Worth a look.
    Yellow,
    /// Needs human follow-up.
    Red,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Yellow => write!(f, "yellow"),
            RiskLevel::Red => write!(f, "red"),
        }
    }
}

/// A signal that an assessment session warrants human follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    /// Flag severity.
    pub level: RiskLevel,
    /// Human-readable reason.
    pub reason: String,
}

impl RiskFlag {
    /// Create a yellow flag.
    pub fn yellow(reason: impl Into<String>) -> Self {
        Self {
            level: RiskLevel::Yellow,
            reason: reason.into(),
        }
    }

    /// Create a red flag.
    pub fn red(reason: impl Into<String>) -> Self {
        Self {
            level: RiskLevel::Red,
            reason: reason.into(),
        }
    }
}
