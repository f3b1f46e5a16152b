//! At-risk signals for assessment sessions.

use tracing::debug;

use crate::config::RiskConfig;
use crate::core::{AssessmentRecord, CareerMatch, FinancialConstraint, RiskFlag};

/// A pure risk rule: at most one flag per record.
pub type RiskRule = fn(&AssessmentRecord, &RiskConfig) -> Option<RiskFlag>;

/// Number of leading career matches the focus and cost rules look at.
const TOP_MATCHES: usize = 3;

/// Default risk rules, in output order.
pub const DEFAULT_RISK_RULES: &[RiskRule] =
    &[rushed, no_clear_focus, financial_mismatch, uniform_responses];

fn top_matches(record: &AssessmentRecord) -> &[CareerMatch] {
    let matches = record.career_matches();
    &matches[..matches.len().min(TOP_MATCHES)]
}

fn rushed(record: &AssessmentRecord, config: &RiskConfig) -> Option<RiskFlag> {
    let minutes = record.completion_minutes()?;
    // One decimal place at most; whole values print without one.
    let shown = (minutes * 10.0).round() / 10.0;
    (minutes < config.rushed_minutes)
        .then(|| RiskFlag::red(format!("Rushed assessment ({} min)", shown)))
}

fn no_clear_focus(record: &AssessmentRecord, config: &RiskConfig) -> Option<RiskFlag> {
    let top = top_matches(record);
    if top.len() < TOP_MATCHES {
        return None;
    }
    (top[0].score - top[2].score < config.focus_spread)
        .then(|| RiskFlag::yellow("No clear career focus - multiple similar matches"))
}

fn financial_mismatch(record: &AssessmentRecord, config: &RiskConfig) -> Option<RiskFlag> {
    if record.financial_constraint != Some(FinancialConstraint::CannotAfford) {
        return None;
    }
    let high_cost = top_matches(record).iter().any(|m| {
        m.cost_estimate
            .or_else(|| config.cost_for(&m.career_code))
            .is_some_and(|cost| cost > config.high_cost_threshold)
    });
    high_cost.then(|| RiskFlag::red("Wants high-cost career but indicated financial constraints"))
}

fn uniform_responses(record: &AssessmentRecord, config: &RiskConfig) -> Option<RiskFlag> {
    let answers: Vec<_> = record.answers.values().collect();
    if answers.len() < config.uniform_answers_min.max(2) {
        return None;
    }
    answers
        .windows(2)
        .all(|w| w[0] == w[1])
        .then(|| RiskFlag::yellow("Uniform responses - possible disengagement"))
}

/// Flags assessment sessions that need human follow-up.
///
/// Every rule runs on every record. Missing data only means a rule has
/// nothing to say.
#[derive(Debug, Clone)]
pub struct AtRiskCalculator {
    rules: Vec<RiskRule>,
    config: RiskConfig,
}

impl AtRiskCalculator {
    /// Create a calculator with the default rules.
    pub fn new(config: RiskConfig) -> Self {
        Self {
            rules: DEFAULT_RISK_RULES.to_vec(),
            config,
        }
    }

    /// Register an extra rule after the existing ones.
    pub fn with_rule(mut self, rule: RiskRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Calculate risk flags in rule order.
    pub fn calculate(&self, record: &AssessmentRecord) -> Vec<RiskFlag> {
        let flags: Vec<RiskFlag> = self
            .rules
            .iter()
            .filter_map(|rule| rule(record, &self.config))
            .collect();
        debug!(flags = flags.len(), "calculated risk flags");
        flags
    }
}

impl Default for AtRiskCalculator {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}
