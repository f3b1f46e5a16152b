//! Learner profile types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{GuidanceError, Result};

/// A grade tier that has eligibility gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GradeTier {
    /// Grade 10: subject choice.
    Ten,
    /// Grade 11: institution targeting.
    Eleven,
    /// Grade 12: application logistics.
    Twelve,
}

impl GradeTier {
    /// Get all tiers.
    pub fn all() -> &'static [GradeTier] {
        &[GradeTier::Ten, GradeTier::Eleven, GradeTier::Twelve]
    }

    /// Map a school grade to its tier, if that grade has gates.
    pub fn from_grade(grade: u8) -> Option<Self> {
        match grade {
            10 => Some(GradeTier::Ten),
            11 => Some(GradeTier::Eleven),
            12 => Some(GradeTier::Twelve),
            _ => None,
        }
    }

    /// The school grade number.
    pub fn grade(&self) -> u8 {
        match self {
            GradeTier::Ten => 10,
            GradeTier::Eleven => 11,
            GradeTier::Twelve => 12,
        }
    }
}

impl TryFrom<u8> for GradeTier {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        GradeTier::from_grade(value)
            .ok_or_else(|| format!("grade tier must be 10, 11 or 12 (got {})", value))
    }
}

impl From<GradeTier> for u8 {
    fn from(tier: GradeTier) -> Self {
        tier.grade()
    }
}

impl std::fmt::Display for GradeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "grade {}", self.grade())
    }
}

/// The querying learner's state for one request.
///
/// `grade` is kept as the raw school grade: grades outside 10-12 are valid
/// input that simply has no applicable gates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    /// School grade.
    #[serde(default, alias = "gradeTier")]
    pub grade: Option<u8>,
    /// Subjects the learner takes.
    #[serde(default)]
    pub subjects: BTreeSet<String>,
    /// Declared career interests.
    #[serde(default)]
    pub career_interests: BTreeSet<String>,
    /// Institution the learner is aiming for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_institution: Option<String>,
}

impl LearnerProfile {
    /// Create a profile for the given grade.
    pub fn new(grade: u8) -> Self {
        Self {
            grade: Some(grade),
            ..Self::default()
        }
    }

    /// Add a subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.insert(subject.into());
        self
    }

    /// Add a career interest.
    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        self.career_interests.insert(interest.into());
        self
    }

    /// Set the target institution.
    pub fn with_target_institution(mut self, institution: impl Into<String>) -> Self {
        self.target_institution = Some(institution.into());
        self
    }

    /// The gate tier for this learner, if any.
    pub fn tier(&self) -> Option<GradeTier> {
        self.grade.and_then(GradeTier::from_grade)
    }

    /// The target institution, ignoring blank values.
    pub fn target_institution(&self) -> Option<&str> {
        self.target_institution
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Reject blank subject or interest entries.
    ///
    /// Missing fields are fine (they mean "no gate applicable"); present but
    /// empty entries are a caller contract violation.
    pub fn validate(&self) -> Result<()> {
        if self.subjects.iter().any(|s| s.trim().is_empty()) {
            return Err(GuidanceError::invalid_input(
                "learner profile contains a blank subject",
            ));
        }
        if self.career_interests.iter().any(|s| s.trim().is_empty()) {
            return Err(GuidanceError::invalid_input(
                "learner profile contains a blank career interest",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grade() {
        assert_eq!(GradeTier::from_grade(10), Some(GradeTier::Ten));
        assert_eq!(GradeTier::from_grade(11), Some(GradeTier::Eleven));
        assert_eq!(GradeTier::from_grade(12), Some(GradeTier::Twelve));
        assert_eq!(GradeTier::from_grade(9), None);
        assert_eq!(GradeTier::from_grade(13), None);
    }

    #[test]
    fn test_grade_tier_serializes_as_number() {
        assert_eq!(serde_json::to_string(&GradeTier::Eleven).unwrap(), "11");
        let tier: GradeTier = serde_json::from_str("12").unwrap();
        assert_eq!(tier, GradeTier::Twelve);
        assert!(serde_json::from_str::<GradeTier>("9").is_err());
    }

    #[test]
    fn test_profile_tier_for_ungated_grade() {
        assert_eq!(LearnerProfile::new(8).tier(), None);
        assert_eq!(LearnerProfile::default().tier(), None);
        assert_eq!(LearnerProfile::new(10).tier(), Some(GradeTier::Ten));
    }

    #[test]
    fn test_target_institution_ignores_blank() {
        let profile = LearnerProfile::new(11).with_target_institution("   ");
        assert_eq!(profile.target_institution(), None);

        let profile = LearnerProfile::new(11).with_target_institution(" Wits ");
        assert_eq!(profile.target_institution(), Some("Wits"));
    }

    #[test]
    fn test_validate_rejects_blank_subject() {
        let profile = LearnerProfile::new(10).with_subject("");
        assert!(profile.validate().unwrap_err().is_caller_error());
    }

    #[test]
    fn test_validate_rejects_blank_interest() {
        let profile = LearnerProfile::new(10).with_interest("  ");
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_json_accepts_grade_tier_alias() {
        let json = r#"{
            "gradeTier": 10,
            "subjects": ["Maths Literacy", "Physical Sciences"],
            "careerInterests": ["Engineering"]
        }"#;
        let profile: LearnerProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.tier(), Some(GradeTier::Ten));
        assert!(profile.subjects.contains("Maths Literacy"));
        assert!(profile.target_institution().is_none());
    }
}
