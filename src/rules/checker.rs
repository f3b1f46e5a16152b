//! Structural rule checks for drafted answers.
//!
//! Rules are a registered, ordered list of pure functions over
//! `(draft, profile, query)`. Each rule reports at most one issue, or skips
//! itself when an input it needs is missing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RuleConfig;
use crate::core::{DraftAnswer, LearnerProfile};
use crate::error::Result;
use crate::grounding::tokens::token_set;

// =============================================================================
// Types
// =============================================================================

/// How serious a rule issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Fails the check.
    Blocking,
    /// Reported but does not fail the check.
    Advisory,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Blocking => write!(f, "blocking"),
            IssueSeverity::Advisory => write!(f, "advisory"),
        }
    }
}

/// One problem found by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleIssue {
    /// Code of the rule that raised the issue.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Issue severity.
    pub severity: IssueSeverity,
}

/// Result of running every registered rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckResult {
    /// No blocking issue was raised.
    pub passed: bool,
    /// Issues in rule registration order.
    pub issues: Vec<RuleIssue>,
    /// Executed rules / applicable rules.
    pub confidence: f64,
}

impl RuleCheckResult {
    /// Issues that fail the check.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &RuleIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Blocking)
    }
}

/// Inputs every rule sees.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// Draft answer text.
    pub draft: &'a str,
    /// The learner the answer is for.
    pub profile: &'a LearnerProfile,
    /// The learner's question. May be empty.
    pub query: &'a str,
}

/// What a single rule concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// An input the rule needs was missing.
    Skipped,
    /// The rule ran and found nothing.
    Passed,
    /// The rule ran and found a problem.
    Issue(String),
}

/// A pure rule function.
pub type RuleFn = fn(&RuleInput<'_>, &RuleConfig) -> RuleOutcome;

/// A registered rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Stable rule code.
    pub code: &'static str,
    /// Severity of the issue this rule raises.
    pub severity: IssueSeverity,
    /// The check itself.
    pub check: RuleFn,
}

impl Rule {
    /// Create a rule.
    pub const fn new(code: &'static str, severity: IssueSeverity, check: RuleFn) -> Self {
        Self {
            code,
            severity,
            check,
        }
    }
}

// =============================================================================
// Default rules
// =============================================================================

/// The default rule set, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("answer_min_length", IssueSeverity::Blocking, answer_min_length),
        Rule::new("answer_max_length", IssueSeverity::Advisory, answer_max_length),
        Rule::new("prohibited_terms", IssueSeverity::Blocking, prohibited_terms),
        Rule::new("financial_disclaimer", IssueSeverity::Blocking, financial_disclaimer),
        Rule::new("query_relevance", IssueSeverity::Advisory, query_relevance),
        Rule::new("discouraging_tone", IssueSeverity::Advisory, discouraging_tone),
    ]
}

fn answer_min_length(input: &RuleInput<'_>, config: &RuleConfig) -> RuleOutcome {
    let length = input.draft.trim().chars().count();
    if length < config.min_length.max(1) {
        RuleOutcome::Issue(format!(
            "answer too short: {} chars (min: {})",
            length, config.min_length
        ))
    } else {
        RuleOutcome::Passed
    }
}

fn answer_max_length(input: &RuleInput<'_>, config: &RuleConfig) -> RuleOutcome {
    let length = input.draft.trim().chars().count();
    if length > config.max_length {
        RuleOutcome::Issue(format!(
            "answer too long: {} chars (max: {})",
            length, config.max_length
        ))
    } else {
        RuleOutcome::Passed
    }
}

fn prohibited_terms(input: &RuleInput<'_>, config: &RuleConfig) -> RuleOutcome {
    let lower = input.draft.to_lowercase();
    let found: Vec<&str> = config
        .prohibited_terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
        .collect();

    if found.is_empty() {
        RuleOutcome::Passed
    } else {
        RuleOutcome::Issue(format!("answer contains prohibited terms: {}", found.join(", ")))
    }
}

fn financial_disclaimer(input: &RuleInput<'_>, config: &RuleConfig) -> RuleOutcome {
    // Keywords and text share the content tokenizer, so "costs" meets "cost".
    let mentions_money = |text: &str| {
        let present = token_set(text);
        config.financial_keywords.iter().any(|k| {
            let keyword = token_set(k);
            !keyword.is_empty() && keyword.is_subset(&present)
        })
    };
    if !mentions_money(input.draft) && !mentions_money(input.query) {
        return RuleOutcome::Passed;
    }

    let lower = input.draft.to_lowercase();
    let has_disclaimer = config
        .disclaimer_phrases
        .iter()
        .any(|p| lower.contains(&p.to_lowercase()));
    if has_disclaimer {
        RuleOutcome::Passed
    } else {
        RuleOutcome::Issue(
            "financial guidance must say that amounts may change and should be confirmed"
                .to_string(),
        )
    }
}

fn query_relevance(input: &RuleInput<'_>, _config: &RuleConfig) -> RuleOutcome {
    let query_tokens = token_set(input.query);
    if query_tokens.is_empty() {
        return RuleOutcome::Skipped;
    }
    let draft_tokens = token_set(input.draft);
    if query_tokens.intersection(&draft_tokens).next().is_some() {
        RuleOutcome::Passed
    } else {
        RuleOutcome::Issue("answer shares no key terms with the question".to_string())
    }
}

fn discouraging_tone(input: &RuleInput<'_>, config: &RuleConfig) -> RuleOutcome {
    let lower = input.draft.to_lowercase();
    match config
        .discouraging_phrases
        .iter()
        .find(|p| !p.trim().is_empty() && lower.contains(&p.to_lowercase()))
    {
        Some(phrase) => RuleOutcome::Issue(format!("discouraging tone: '{}'", phrase)),
        None => RuleOutcome::Passed,
    }
}

// =============================================================================
// Checker
// =============================================================================

/// Runs an ordered list of rules over a draft answer.
#[derive(Debug, Clone)]
pub struct RuleBasedChecker {
    rules: Vec<Rule>,
    config: RuleConfig,
}

impl RuleBasedChecker {
    /// Create a checker with the default rules.
    pub fn new(config: RuleConfig) -> Self {
        Self {
            rules: default_rules(),
            config,
        }
    }

    /// Create a checker with an explicit rule list.
    pub fn with_rules(rules: Vec<Rule>, config: RuleConfig) -> Self {
        Self { rules, config }
    }

    /// Register an extra rule after the existing ones.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Remove every rule with the given code.
    pub fn without_rule(mut self, code: &str) -> Self {
        self.rules.retain(|r| r.code != code);
        self
    }

    /// Registered rule codes, in order.
    pub fn rule_codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.code).collect()
    }

    /// Check a draft. A draft with no `text` is rejected.
    pub fn check(
        &self,
        draft: &DraftAnswer,
        profile: &LearnerProfile,
        query: &str,
    ) -> Result<RuleCheckResult> {
        let input = RuleInput {
            draft: draft.text()?,
            profile,
            query,
        };

        let mut issues = Vec::new();
        let mut executed = 0usize;

        for rule in &self.rules {
            match (rule.check)(&input, &self.config) {
                RuleOutcome::Skipped => {
                    debug!(rule = rule.code, "rule skipped");
                }
                RuleOutcome::Passed => executed += 1,
                RuleOutcome::Issue(message) => {
                    executed += 1;
                    issues.push(RuleIssue {
                        code: rule.code.to_string(),
                        message,
                        severity: rule.severity,
                    });
                }
            }
        }

        let confidence = if self.rules.is_empty() {
            1.0
        } else {
            executed as f64 / self.rules.len() as f64
        };
        let passed = !issues.iter().any(|i| i.severity == IssueSeverity::Blocking);

        debug!(
            rules = self.rules.len(),
            executed,
            issues = issues.len(),
            passed,
            "rule check complete"
        );

        Ok(RuleCheckResult {
            passed,
            issues,
            confidence,
        })
    }
}

impl Default for RuleBasedChecker {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuidanceError;

    const GOOD_ANSWER: &str = "Engineering at UCT requires pure Mathematics and Physical \
                               Sciences with an APS of at least 35.";

    fn profile() -> LearnerProfile {
        LearnerProfile::new(11).with_interest("Engineering")
    }

    fn check(text: &str, query: &str) -> RuleCheckResult {
        RuleBasedChecker::default()
            .check(&DraftAnswer::new(text), &profile(), query)
            .unwrap()
    }

    fn codes(result: &RuleCheckResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn test_empty_draft_fails_with_blocking_issue() {
        let result = check("", "What do I need for engineering?");
        assert!(!result.passed);
        assert!(result.blocking_issues().count() >= 1);
        assert_eq!(result.issues[0].code, "answer_min_length");
    }

    #[test]
    fn test_empty_draft_fails_even_with_zero_min_length() {
        let config = RuleConfig {
            min_length: 0,
            ..RuleConfig::default()
        };
        let result = RuleBasedChecker::new(config)
            .check(&DraftAnswer::new("   "), &profile(), "")
            .unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn test_missing_text_is_invalid_input() {
        let err = RuleBasedChecker::default()
            .check(&DraftAnswer::default(), &profile(), "")
            .unwrap_err();
        assert!(matches!(err, GuidanceError::InvalidInput { .. }));
    }

    #[test]
    fn test_good_answer_passes_all_rules() {
        let result = check(GOOD_ANSWER, "What APS do I need for engineering at UCT?");
        assert!(result.passed);
        assert!(result.issues.is_empty());
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_empty_query_skips_relevance_rule() {
        let result = check(GOOD_ANSWER, "");
        assert!(result.passed);
        let expected = 5.0 / 6.0;
        assert!((result.confidence - expected).abs() < 1e-12);
    }

    #[test]
    fn test_prohibited_term_blocks() {
        let text = format!("{} This gives you guaranteed admission.", GOOD_ANSWER);
        let result = check(&text, "");
        assert!(!result.passed);
        assert_eq!(codes(&result), vec!["prohibited_terms"]);
        assert!(result.issues[0].message.contains("guaranteed admission"));
    }

    #[test]
    fn test_financial_answer_needs_disclaimer() {
        let text = "NSFAS covers tuition and accommodation for qualifying students at public universities.";
        let result = check(text, "");
        assert!(!result.passed);
        assert_eq!(codes(&result), vec!["financial_disclaimer"]);

        let with_disclaimer = format!("{} Amounts are subject to change.", text);
        assert!(check(&with_disclaimer, "").passed);
    }

    #[test]
    fn test_plural_financial_keywords_need_disclaimer() {
        for text in [
            "Medicine costs about R70000 per year at most public universities in South Africa.",
            "Student loans and scholarships are available for engineering at several universities.",
        ] {
            let result = check(text, "");
            assert_eq!(codes(&result), vec!["financial_disclaimer"], "{}", text);

            let with_disclaimer = format!("{} Please confirm with the university.", text);
            assert!(check(&with_disclaimer, "").passed);
        }
    }

    #[test]
    fn test_financial_query_triggers_disclaimer_rule() {
        let result = check(GOOD_ANSWER, "How much are the fees for engineering?");
        assert!(codes(&result).contains(&"financial_disclaimer"));
    }

    #[test]
    fn test_advisory_issues_do_not_fail() {
        let text = format!("{} Honestly, you cannot expect it to be easy.", GOOD_ANSWER);
        let result = check(&text, "");
        assert!(result.passed);
        assert_eq!(codes(&result), vec!["discouraging_tone"]);
        assert_eq!(result.issues[0].severity, IssueSeverity::Advisory);
    }

    #[test]
    fn test_irrelevant_answer_is_advisory() {
        let result = check(GOOD_ANSWER, "Which nursing colleges are in Durban?");
        assert!(result.passed);
        assert_eq!(codes(&result), vec!["query_relevance"]);
    }

    #[test]
    fn test_too_long_answer_is_advisory() {
        let config = RuleConfig {
            max_length: 50,
            ..RuleConfig::default()
        };
        let result = RuleBasedChecker::new(config)
            .check(&DraftAnswer::new(GOOD_ANSWER), &profile(), "")
            .unwrap();
        assert!(result.passed);
        assert_eq!(codes(&result), vec!["answer_max_length"]);
    }

    #[test]
    fn test_rules_can_be_added_and_removed() {
        fn always_flags(_: &RuleInput<'_>, _: &RuleConfig) -> RuleOutcome {
            RuleOutcome::Issue("flagged".to_string())
        }

        let checker = RuleBasedChecker::default()
            .without_rule("answer_min_length")
            .with_rule(Rule::new("always", IssueSeverity::Blocking, always_flags));

        assert!(!checker.rule_codes().contains(&"answer_min_length"));
        assert_eq!(checker.rule_codes().last(), Some(&"always"));

        let result = checker.check(&DraftAnswer::new(""), &profile(), "").unwrap();
        assert_eq!(codes(&result), vec!["always"]);
    }

    #[test]
    fn test_rules_see_profile() {
        fn needs_grade(input: &RuleInput<'_>, _: &RuleConfig) -> RuleOutcome {
            match input.profile.grade {
                Some(_) => RuleOutcome::Passed,
                None => RuleOutcome::Skipped,
            }
        }

        let checker = RuleBasedChecker::with_rules(
            vec![Rule::new("needs_grade", IssueSeverity::Advisory, needs_grade)],
            RuleConfig::default(),
        );
        let result = checker
            .check(&DraftAnswer::new(GOOD_ANSWER), &LearnerProfile::default(), "")
            .unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(result.passed);
    }

    #[test]
    fn test_no_rules_is_full_confidence() {
        let checker = RuleBasedChecker::with_rules(Vec::new(), RuleConfig::default());
        let result = checker.check(&DraftAnswer::new(""), &profile(), "").unwrap();
        assert!(result.passed);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_check_is_idempotent() {
        let text = format!("{} Fees may vary. Give up on Medicine.", GOOD_ANSWER);
        let a = serde_json::to_string(&check(&text, "engineering fees")).unwrap();
        let b = serde_json::to_string(&check(&text, "engineering fees")).unwrap();
        assert_eq!(a, b);
    }
}
