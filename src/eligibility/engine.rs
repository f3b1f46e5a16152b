//! Eligibility gate evaluation.
//!
//! Each grade tier has exactly one way of selecting gates:
//!
//! | Tier | Selection                                                   |
//! |------|-------------------------------------------------------------|
//! | 10   | subject gates whose conflict categories meet an interest    |
//! | 11   | every institution gate whose name contains the target       |
//! | 12   | every logistics gate, regardless of profile                 |
//!
//! Any other grade, or a profile missing the fields a tier needs, yields no
//! gates. A repository failure is an error, never an empty result.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::GateConfig;
use crate::core::{Gate, GradeTier, LearnerProfile, SelectorType};
use crate::error::Result;
use crate::storage::{GateRepository, GateSelector};

/// Evaluates learner profiles against the gates for their grade tier.
#[derive(Debug)]
pub struct EligibilityGateEngine<R: GateRepository> {
    repository: R,
    config: GateConfig,
}

impl<R: GateRepository> EligibilityGateEngine<R> {
    /// Create an engine over a repository.
    pub fn new(repository: R, config: GateConfig) -> Self {
        Self { repository, config }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Return the gates this profile triggers, in repository order.
    ///
    /// Callers that need priority order should sort by severity.
    pub fn evaluate(&self, profile: &LearnerProfile) -> Result<Vec<Gate>> {
        let Some(tier) = profile.tier() else {
            debug!(grade = ?profile.grade, "no gate tier for grade");
            return Ok(Vec::new());
        };

        let gates = match tier {
            GradeTier::Ten => self.subject_conflicts(profile)?,
            GradeTier::Eleven => self.institution_gates(profile)?,
            GradeTier::Twelve => self.fetch(
                tier,
                &GateSelector::all_of(SelectorType::Logistics),
            )?,
        };

        debug!(
            tier = tier.grade(),
            triggered = gates.len(),
            repository = self.repository.name(),
            "evaluated eligibility gates"
        );
        Ok(gates)
    }

    fn subject_conflicts(&self, profile: &LearnerProfile) -> Result<Vec<Gate>> {
        if profile.subjects.is_empty() || profile.career_interests.is_empty() {
            return Ok(Vec::new());
        }

        let categories: BTreeSet<&str> = profile
            .career_interests
            .iter()
            .map(|interest| self.config.resolve_category(interest))
            .collect();

        let selectors: Vec<GateSelector> =
            profile.subjects.iter().map(GateSelector::subject).collect();

        // One pass over the stored subject gates keeps repository order and
        // yields each gate once, however many subject spellings match it.
        let candidates = self.fetch(
            GradeTier::Ten,
            &GateSelector::all_of(SelectorType::Subject),
        )?;
        Ok(candidates
            .into_iter()
            .filter(|gate| selectors.iter().any(|s| s.matches(gate)))
            .filter(|gate| {
                categories
                    .iter()
                    .any(|category| gate.conflicts_with_category(category))
            })
            .collect())
    }

    fn institution_gates(&self, profile: &LearnerProfile) -> Result<Vec<Gate>> {
        match profile.target_institution() {
            Some(target) => self.fetch(
                GradeTier::Eleven,
                &GateSelector::institution_contains(target),
            ),
            None => Ok(Vec::new()),
        }
    }

    fn fetch(&self, tier: GradeTier, selector: &GateSelector) -> Result<Vec<Gate>> {
        debug!(tier = tier.grade(), %selector, "fetching gates");
        self.repository.fetch_gates(tier, selector)
    }
}

/// Whether any gate in the set blocks the answer.
pub fn any_blocking(gates: &[Gate]) -> bool {
    gates.iter().any(|g| g.severity.is_blocking())
}

/// Sort gates so blocking gates come first, keeping repository order within
/// each severity.
pub fn sort_by_severity(gates: &mut [Gate]) {
    gates.sort_by_key(|g| g.severity);
}
