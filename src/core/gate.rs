//! Eligibility gate records.
//!
//! Gates are immutable reference data owned by a [`GateRepository`]. The
//! engine only reads them. Every gate carries non-empty guidance text and a
//! closed severity of `block` or `advise`.
//!
//! [`GateRepository`]: crate::storage::GateRepository

use serde::{Deserialize, Serialize};

use crate::core::profile::GradeTier;
use crate::error::{GuidanceError, Result};

/// What part of the learner profile a gate is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorType {
    /// Subject-conflict gate (grade 10).
    Subject,
    /// Target institution gate (grade 11).
    Institution,
    /// Deadline and process guidance (grade 12).
    Logistics,
}

impl SelectorType {
    /// Get the wire name for this selector type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorType::Subject => "subject",
            SelectorType::Institution => "institution",
            SelectorType::Logistics => "logistics",
        }
    }
}

impl std::fmt::Display for SelectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly a triggered gate constrains the answer.
///
/// Ordered so that sorting ascending puts `Block` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSeverity {
    /// The combination must be corrected before guidance is shown.
    Block,
    /// Guidance is shown with the gate's advice attached.
    Advise,
}

impl GateSeverity {
    /// Check whether this severity blocks the answer.
    pub fn is_blocking(&self) -> bool {
        matches!(self, GateSeverity::Block)
    }
}

impl std::fmt::Display for GateSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateSeverity::Block => write!(f, "block"),
            GateSeverity::Advise => write!(f, "advise"),
        }
    }
}

/// An eligibility gate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    /// Grade tier this gate applies to.
    pub grade_tier: GradeTier,
    /// Which profile field the gate is keyed on.
    pub selector_type: SelectorType,
    /// Subject name, institution name, or logistics topic.
    pub selector_key: String,
    /// Corrective guidance shown when the gate triggers.
    pub guidance_text: String,
    /// Block or advise.
    pub severity: GateSeverity,
    /// Career categories a subject gate conflicts with.
    ///
    /// Only meaningful for [`SelectorType::Subject`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub career_categories: Vec<String>,
}

impl Gate {
    /// Create a new gate.
    pub fn new(
        grade_tier: GradeTier,
        selector_type: SelectorType,
        selector_key: impl Into<String>,
        guidance_text: impl Into<String>,
        severity: GateSeverity,
    ) -> Self {
        Self {
            grade_tier,
            selector_type,
            selector_key: selector_key.into(),
            guidance_text: guidance_text.into(),
            severity,
            career_categories: Vec::new(),
        }
    }

    /// Set the career categories a subject gate conflicts with.
    pub fn with_career_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.career_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Check the record invariant: guidance text and selector key are non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.guidance_text.trim().is_empty() {
            return Err(GuidanceError::invalid_input(format!(
                "gate '{}' has empty guidance text",
                self.selector_key
            )));
        }
        if self.selector_key.trim().is_empty() {
            return Err(GuidanceError::invalid_input(
                "gate has empty selector key",
            ));
        }
        Ok(())
    }

    /// Whether this gate conflicts with the given career category.
    ///
    /// Exact, case-insensitive membership; never a substring match.
    pub fn conflicts_with_category(&self, category: &str) -> bool {
        let category = category.trim();
        self.career_categories
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(category))
    }

    /// Project this gate into its caller-facing form.
    pub fn to_triggered(&self) -> TriggeredGate {
        TriggeredGate {
            selector_type: self.selector_type,
            selector_key: self.selector_key.clone(),
            guidance_text: self.guidance_text.clone(),
            severity: self.severity,
        }
    }
}

/// Caller-facing projection of a triggered gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredGate {
    /// Which profile field the gate is keyed on.
    pub selector_type: SelectorType,
    /// Subject name, institution name, or logistics topic.
    pub selector_key: String,
    /// Corrective guidance.
    pub guidance_text: String,
    /// Block or advise.
    pub severity: GateSeverity,
}
