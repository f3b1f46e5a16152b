//! Structural rule checks that run independently of grounding.

pub mod checker;

pub use checker::{
    default_rules, IssueSeverity, Rule, RuleBasedChecker, RuleCheckResult, RuleFn, RuleInput,
    RuleIssue, RuleOutcome,
};
