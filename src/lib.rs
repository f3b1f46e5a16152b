//! guidance-gate - quality and eligibility pipeline for career guidance
//!
//! Certifies a drafted answer before it reaches a learner: grade-specific
//! eligibility gates, grounding of every factual claim in retrieved
//! knowledge, structural rule checks, and at-risk signals for completed
//! assessments, combined into one decision per request.

pub mod cli;
pub mod config;
pub mod core;
pub mod eligibility;
pub mod error;
pub mod grounding;
pub mod pipeline;
pub mod risk;
pub mod rules;
pub mod storage;

pub use config::Config;
pub use core::{
    AssessmentRecord, CareerMatch, DraftAnswer, FinancialConstraint, Gate, GateSeverity,
    GradeTier, KnowledgeChunk, LearnerProfile, RiskFlag, RiskLevel, SelectorType, TriggeredGate,
};
pub use eligibility::EligibilityGateEngine;
pub use error::{GuidanceError, Result};
pub use grounding::{
    Claim, GroundingResult, LexicalOverlapMatcher, SourceGroundingValidator, SupportMatcher,
};
pub use pipeline::{
    CancellationFlag, GuidanceDecision, GuidanceRequest, PipelineStage, QualityPipeline,
};
pub use risk::AtRiskCalculator;
pub use rules::{IssueSeverity, RuleBasedChecker, RuleCheckResult, RuleIssue};
pub use storage::{FileGateRepository, GateRepository, GateSelector, MemoryGateRepository};
