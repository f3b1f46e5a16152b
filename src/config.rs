//! Configuration loading for the guidance pipeline.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.guidance/config.toml`)
//! 3. User config (`~/.guidance/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! Evaluators never read this chain themselves. The caller loads a
//! [`Config`] once and hands each evaluator its own section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, GuidanceError, Result};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Eligibility gate configuration.
    pub gates: GateConfig,
    /// Grounding validator configuration.
    pub grounding: GroundingConfig,
    /// Rule checker configuration.
    pub rules: RuleConfig,
    /// At-risk calculator configuration.
    pub risk: RiskConfig,
    /// Pipeline orchestration configuration.
    pub pipeline: PipelineConfig,
    /// Gate repository location.
    pub repository: RepositoryConfig,
}

/// Eligibility gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Career interest -> career category.
    ///
    /// Interests with no entry are treated as categories themselves.
    pub career_categories: BTreeMap<String, String>,
}

impl GateConfig {
    /// Resolve a declared career interest to its category.
    pub fn resolve_category<'a>(&'a self, interest: &'a str) -> &'a str {
        let interest = interest.trim();
        self.career_categories
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(interest))
            .map(|(_, v)| v.as_str())
            .unwrap_or(interest)
    }
}

/// Grounding validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroundingConfig {
    /// Fraction of a claim's content words a chunk must contain to support it.
    pub overlap_threshold: f64,
    /// Minimum content words for a sentence to count as a factual claim.
    pub min_claim_tokens: usize,
}

impl GroundingConfig {
    /// Check that a threshold is in (0.0, 1.0].
    pub fn is_valid_threshold(value: f64) -> bool {
        value.is_finite() && value > 0.0 && value <= 1.0
    }
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.6,
            min_claim_tokens: 2,
        }
    }
}

/// Rule checker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    /// Minimum answer length in characters.
    pub min_length: usize,
    /// Maximum answer length in characters.
    pub max_length: usize,
    /// Phrases that must never appear in an answer.
    pub prohibited_terms: Vec<String>,
    /// Words that make an answer financial guidance.
    pub financial_keywords: Vec<String>,
    /// Phrases that count as a financial disclaimer.
    pub disclaimer_phrases: Vec<String>,
    /// Phrases that make the tone discouraging.
    pub discouraging_phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_length: 40,
            max_length: 4000,
            prohibited_terms: strings(&[
                "guaranteed admission",
                "guaranteed acceptance",
                "guaranteed job",
                "guaranteed bursary",
                "100% pass",
            ]),
            financial_keywords: strings(&[
                "fee", "fees", "tuition", "bursary", "bursaries", "loan", "nsfas", "cost",
                "funding", "scholarship",
            ]),
            disclaimer_phrases: strings(&[
                "subject to change",
                "confirm with",
                "verify with",
                "check with",
                "may vary",
            ]),
            discouraging_phrases: strings(&[
                "you will fail",
                "you can't",
                "you cannot",
                "not smart enough",
                "give up",
                "impossible for you",
            ]),
        }
    }
}

/// At-risk calculator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Completion time below which an assessment counts as rushed.
    pub rushed_minutes: f64,
    /// Top-1 minus top-3 score spread below which focus is unclear.
    pub focus_spread: f64,
    /// Study cost above which a career counts as high-cost.
    pub high_cost_threshold: f64,
    /// Career code -> cost estimate, used when a match carries none.
    pub career_costs: BTreeMap<String, f64>,
    /// Minimum answers before uniform responses are flagged.
    pub uniform_answers_min: usize,
}

impl RiskConfig {
    /// Cost estimate for a career code from the configured table.
    pub fn cost_for(&self, career_code: &str) -> Option<f64> {
        self.career_costs.get(career_code).copied()
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            rushed_minutes: 5.0,
            focus_spread: 10.0,
            high_cost_threshold: 50_000.0,
            career_costs: BTreeMap::new(),
            uniform_answers_min: 5,
        }
    }
}

/// Pipeline orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run gates, grounding and rules concurrently.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Gate repository location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Path to a JSON file of gate records.
    pub gates_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let path = guidance_home()?.join("config.toml");
        path.exists()
            .then(|| Self::load_from_file(&path).fail_open_default("loading user config"))
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_guidance_dir(cwd).join("config.toml");
        path.exists()
            .then(|| Self::load_from_file(&path).fail_open_default("loading project config"))
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| GuidanceError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| GuidanceError::config(e.to_string()))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GuidanceError::config(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("GUIDANCE_GROUNDING_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(n) if GroundingConfig::is_valid_threshold(n) => {
                    self.grounding.overlap_threshold = n
                }
                _ => tracing::warn!(
                    "Invalid GUIDANCE_GROUNDING_THRESHOLD value '{}'. \
                    Must be in (0.0, 1.0]. Using '{}'.",
                    val,
                    self.grounding.overlap_threshold
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_MIN_CLAIM_TOKENS") {
            match val.parse::<usize>() {
                Ok(n) if n >= 1 => self.grounding.min_claim_tokens = n,
                _ => tracing::warn!(
                    "Invalid GUIDANCE_MIN_CLAIM_TOKENS value '{}'. \
                    Expected a positive integer. Using '{}'.",
                    val,
                    self.grounding.min_claim_tokens
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_MIN_ANSWER_LENGTH") {
            match val.parse::<usize>() {
                Ok(n) => self.rules.min_length = n,
                Err(_) => tracing::warn!(
                    "Invalid GUIDANCE_MIN_ANSWER_LENGTH value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val,
                    self.rules.min_length
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_RUSHED_MINUTES") {
            match val.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => self.risk.rushed_minutes = n,
                _ => tracing::warn!(
                    "Invalid GUIDANCE_RUSHED_MINUTES value '{}'. Using '{}'.",
                    val,
                    self.risk.rushed_minutes
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_FOCUS_SPREAD") {
            match val.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => self.risk.focus_spread = n,
                _ => tracing::warn!(
                    "Invalid GUIDANCE_FOCUS_SPREAD value '{}'. Using '{}'.",
                    val,
                    self.risk.focus_spread
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_HIGH_COST_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => self.risk.high_cost_threshold = n,
                _ => tracing::warn!(
                    "Invalid GUIDANCE_HIGH_COST_THRESHOLD value '{}'. Using '{}'.",
                    val,
                    self.risk.high_cost_threshold
                ),
            }
        }

        if let Ok(val) = env::var("GUIDANCE_PARALLEL") {
            self.pipeline.parallel = val == "true" || val == "1";
        }

        if let Ok(val) = env::var("GUIDANCE_GATES_PATH") {
            if val.is_empty() {
                tracing::warn!("GUIDANCE_GATES_PATH is empty, ignoring");
            } else {
                self.repository.gates_path = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Non-default values in `other` win. Maps merge additively. A layer
    /// cannot reset a value back to its default (the limitation of merging
    /// without `Option` fields).
    fn merge(mut self, other: Config) -> Self {
        for (k, v) in other.gates.career_categories {
            self.gates.career_categories.insert(k, v);
        }

        let default_grounding = GroundingConfig::default();
        if other.grounding.overlap_threshold != default_grounding.overlap_threshold {
            self.grounding.overlap_threshold = other.grounding.overlap_threshold;
        }
        if other.grounding.min_claim_tokens != default_grounding.min_claim_tokens {
            self.grounding.min_claim_tokens = other.grounding.min_claim_tokens;
        }

        let default_rules = RuleConfig::default();
        if other.rules.min_length != default_rules.min_length {
            self.rules.min_length = other.rules.min_length;
        }
        if other.rules.max_length != default_rules.max_length {
            self.rules.max_length = other.rules.max_length;
        }
        if other.rules.prohibited_terms != default_rules.prohibited_terms {
            self.rules.prohibited_terms = other.rules.prohibited_terms;
        }
        if other.rules.financial_keywords != default_rules.financial_keywords {
            self.rules.financial_keywords = other.rules.financial_keywords;
        }
        if other.rules.disclaimer_phrases != default_rules.disclaimer_phrases {
            self.rules.disclaimer_phrases = other.rules.disclaimer_phrases;
        }
        if other.rules.discouraging_phrases != default_rules.discouraging_phrases {
            self.rules.discouraging_phrases = other.rules.discouraging_phrases;
        }

        let default_risk = RiskConfig::default();
        if other.risk.rushed_minutes != default_risk.rushed_minutes {
            self.risk.rushed_minutes = other.risk.rushed_minutes;
        }
        if other.risk.focus_spread != default_risk.focus_spread {
            self.risk.focus_spread = other.risk.focus_spread;
        }
        if other.risk.high_cost_threshold != default_risk.high_cost_threshold {
            self.risk.high_cost_threshold = other.risk.high_cost_threshold;
        }
        if other.risk.uniform_answers_min != default_risk.uniform_answers_min {
            self.risk.uniform_answers_min = other.risk.uniform_answers_min;
        }
        for (k, v) in other.risk.career_costs {
            self.risk.career_costs.insert(k, v);
        }

        if other.pipeline.parallel != PipelineConfig::default().parallel {
            self.pipeline.parallel = other.pipeline.parallel;
        }

        if other.repository.gates_path.is_some() {
            self.repository.gates_path = other.repository.gates_path;
        }

        self
    }
}

/// Get the guidance home directory.
///
/// Checks `GUIDANCE_HOME` first, then falls back to `~/.guidance`.
pub fn guidance_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("GUIDANCE_HOME") {
        if home.is_empty() {
            tracing::warn!("GUIDANCE_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(".guidance"))
}

/// Get the project `.guidance/` directory for a working directory.
///
/// Walks up from `cwd` looking for an existing `.guidance/` directory and
/// falls back to `cwd/.guidance`.
pub fn project_guidance_dir(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .map(|a| a.join(".guidance"))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| cwd.join(".guidance"))
}
