//! Assessment risk flags.

pub mod calculator;

pub use calculator::{AtRiskCalculator, RiskRule, DEFAULT_RISK_RULES};
