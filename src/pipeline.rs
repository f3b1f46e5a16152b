//! The quality pipeline: one request in, one decision out.
//!
//! A run moves through `Start -> GatesEvaluated -> Validated ->
//! [RiskAssessed] -> Decided`. Gate evaluation, grounding and rule checking
//! share no data and run concurrently when enabled. Any error aborts the run;
//! quality failures are part of the decision, not errors.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

use crate::config::Config;
use crate::core::{
    AssessmentRecord, DraftAnswer, Gate, KnowledgeChunk, LearnerProfile, RiskFlag, TriggeredGate,
};
use crate::eligibility::{any_blocking, EligibilityGateEngine};
use crate::error::{GuidanceError, Result};
use crate::grounding::{GroundingResult, LexicalOverlapMatcher, SourceGroundingValidator, SupportMatcher};
use crate::risk::AtRiskCalculator;
use crate::rules::{RuleBasedChecker, RuleCheckResult};
use crate::storage::GateRepository;

// =============================================================================
// Request / Decision
// =============================================================================

/// Everything the pipeline needs for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceRequest {
    /// The learner asking.
    pub learner_profile: LearnerProfile,
    /// The learner's question. May be empty.
    #[serde(default)]
    pub query: String,
    /// The drafted answer to certify.
    pub draft_answer: DraftAnswer,
    /// Chunks retrieved for the query, in retrieval order.
    #[serde(default)]
    pub retrieved_chunks: Vec<KnowledgeChunk>,
    /// Present when the request follows a completed assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_record: Option<AssessmentRecord>,
}

impl GuidanceRequest {
    /// Create a request without an assessment record.
    pub fn new(
        learner_profile: LearnerProfile,
        query: impl Into<String>,
        draft_answer: DraftAnswer,
        retrieved_chunks: Vec<KnowledgeChunk>,
    ) -> Self {
        Self {
            learner_profile,
            query: query.into(),
            draft_answer,
            retrieved_chunks,
            assessment_record: None,
        }
    }

    /// Attach an assessment record.
    pub fn with_assessment(mut self, record: AssessmentRecord) -> Self {
        self.assessment_record = Some(record);
        self
    }

    /// Reject malformed input before any stage runs.
    pub fn validate(&self) -> Result<()> {
        self.learner_profile.validate()?;
        self.draft_answer.text()?;
        if let Some(record) = &self.assessment_record {
            record.validate()?;
        }
        Ok(())
    }
}

/// The pipeline's single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceDecision {
    /// Gates the profile triggered, in repository order.
    pub triggered_gates: Vec<TriggeredGate>,
    /// Grounding of the draft against the retrieved chunks.
    pub grounding: GroundingResult,
    /// Structural rule check of the draft.
    pub rule_check: RuleCheckResult,
    /// Assessment risk flags. Empty without an assessment record.
    pub risk_flags: Vec<RiskFlag>,
    /// No blocking gate, fully grounded, and every blocking rule passed.
    pub overall_pass: bool,
    /// At least one risk flag was raised.
    pub needs_follow_up: bool,
}

impl GuidanceDecision {
    /// Combine stage results into a decision.
    pub fn new(
        gates: &[Gate],
        grounding: GroundingResult,
        rule_check: RuleCheckResult,
        risk_flags: Vec<RiskFlag>,
    ) -> Self {
        let overall_pass = !any_blocking(gates) && grounding.fully_grounded && rule_check.passed;
        Self {
            triggered_gates: gates.iter().map(Gate::to_triggered).collect(),
            grounding,
            rule_check,
            needs_follow_up: !risk_flags.is_empty(),
            risk_flags,
            overall_pass,
        }
    }
}

// =============================================================================
// Stages and cancellation
// =============================================================================

/// Where a pipeline run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Input accepted, nothing evaluated yet.
    Start,
    /// Eligibility gates have been evaluated.
    GatesEvaluated,
    /// Grounding and rule checks have finished.
    Validated,
    /// At-risk flags have been computed for the attached assessment.
    RiskAssessed,
    /// The decision is final.
    Decided,
}

impl PipelineStage {
    /// Whether a run may move from this stage to `next`.
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Start, GatesEvaluated)
                | (GatesEvaluated, Validated)
                | (Validated, RiskAssessed)
                | (Validated, Decided)
                | (RiskAssessed, Decided)
        )
    }

    /// Whether this is the terminal stage.
    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Decided
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Start => write!(f, "start"),
            PipelineStage::GatesEvaluated => write!(f, "gates_evaluated"),
            PipelineStage::Validated => write!(f, "validated"),
            PipelineStage::RiskAssessed => write!(f, "risk_assessed"),
            PipelineStage::Decided => write!(f, "decided"),
        }
    }
}

/// Caller-owned cancellation signal, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create a flag that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Runs stop at their next stage boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tracks one run's stage and enforces the transition table.
struct StageTracker<'a> {
    stage: PipelineStage,
    cancel: &'a CancellationFlag,
}

impl<'a> StageTracker<'a> {
    fn new(cancel: &'a CancellationFlag) -> Self {
        Self {
            stage: PipelineStage::Start,
            cancel,
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!(stage = %self.stage, "pipeline run cancelled");
            return Err(GuidanceError::cancelled(self.stage.to_string()));
        }
        Ok(())
    }

    fn advance(&mut self, next: PipelineStage) -> Result<()> {
        self.check_cancelled()?;
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        debug!(from = %self.stage, to = %next, "pipeline stage transition");
        self.stage = next;
        Ok(())
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Composes the four evaluators into one decision per request.
#[derive(Debug)]
pub struct QualityPipeline<R: GateRepository, M: SupportMatcher = LexicalOverlapMatcher> {
    gates: EligibilityGateEngine<R>,
    grounding: SourceGroundingValidator<M>,
    rules: RuleBasedChecker,
    risk: AtRiskCalculator,
    parallel: bool,
}

impl<R: GateRepository> QualityPipeline<R, LexicalOverlapMatcher> {
    /// Build a pipeline with default evaluators configured from `config`.
    pub fn from_config(repository: R, config: &Config) -> Self {
        Self::new(
            EligibilityGateEngine::new(repository, config.gates.clone()),
            SourceGroundingValidator::new(&config.grounding),
            RuleBasedChecker::new(config.rules.clone()),
            AtRiskCalculator::new(config.risk.clone()),
        )
        .with_parallel(config.pipeline.parallel)
    }
}

impl<R: GateRepository, M: SupportMatcher> QualityPipeline<R, M> {
    /// Assemble a pipeline from its evaluators. Runs concurrently by default.
    pub fn new(
        gates: EligibilityGateEngine<R>,
        grounding: SourceGroundingValidator<M>,
        rules: RuleBasedChecker,
        risk: AtRiskCalculator,
    ) -> Self {
        Self {
            gates,
            grounding,
            rules,
            risk,
            parallel: true,
        }
    }

    /// Choose concurrent or sequential execution of the independent checks.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run a request to a decision.
    pub fn run(&self, request: &GuidanceRequest) -> Result<GuidanceDecision> {
        self.run_with_cancel(request, &CancellationFlag::new())
    }

    /// Run a request, stopping with [`GuidanceError::Cancelled`] if `cancel`
    /// is set before a decision is reached.
    pub fn run_with_cancel(
        &self,
        request: &GuidanceRequest,
        cancel: &CancellationFlag,
    ) -> Result<GuidanceDecision> {
        request.validate()?;

        let mut tracker = StageTracker::new(cancel);
        tracker.check_cancelled()?;

        let (gates, grounding, rule_check) = self.run_checks(request)?;
        tracker.advance(PipelineStage::GatesEvaluated)?;
        tracker.advance(PipelineStage::Validated)?;

        let risk_flags = match &request.assessment_record {
            Some(record) => {
                tracker.advance(PipelineStage::RiskAssessed)?;
                self.risk.calculate(record)
            }
            None => Vec::new(),
        };

        tracker.advance(PipelineStage::Decided)?;
        let decision = GuidanceDecision::new(&gates, grounding, rule_check, risk_flags);

        info!(
            overall_pass = decision.overall_pass,
            gates = decision.triggered_gates.len(),
            grounding_score = decision.grounding.grounding_score,
            rule_issues = decision.rule_check.issues.len(),
            risk_flags = decision.risk_flags.len(),
            "guidance decision"
        );
        Ok(decision)
    }

    fn run_checks(
        &self,
        request: &GuidanceRequest,
    ) -> Result<(Vec<Gate>, GroundingResult, RuleCheckResult)> {
        let profile = &request.learner_profile;
        let draft = &request.draft_answer;

        let (gates, grounding, rule_check) = if self.parallel {
            thread::scope(|s| {
                let gates = s.spawn(|| self.gates.evaluate(profile));
                let grounding = s.spawn(|| self.grounding.validate(draft, &request.retrieved_chunks));
                let rule_check = self.rules.check(draft, profile, &request.query);
                (join(gates), join(grounding), rule_check)
            })
        } else {
            (
                self.gates.evaluate(profile),
                self.grounding.validate(draft, &request.retrieved_chunks),
                self.rules.check(draft, profile, &request.query),
            )
        };

        Ok((gates?, grounding?, rule_check?))
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}
