//! Evaluate command.
//!
//! Runs one guidance request through the quality pipeline.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{exit_codes, GuidanceError, Result};
use crate::pipeline::{GuidanceDecision, GuidanceRequest, QualityPipeline};
use crate::storage::GateRepository;

/// Options for the evaluate command.
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the evaluate command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateOutput {
    /// Whether the pipeline reached a decision.
    pub success: bool,
    /// The decision, when one was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<GuidanceDecision>,
    /// Error message if the run aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluateOutput {
    /// Create a successful output.
    pub fn success(decision: GuidanceDecision) -> Self {
        Self {
            success: true,
            decision: Some(decision),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            decision: None,
            error: Some(error.into()),
        }
    }

    /// Process exit code for this output.
    pub fn exit_code(&self) -> i32 {
        match &self.decision {
            Some(d) if d.overall_pass => exit_codes::APPROVE,
            Some(_) => exit_codes::BLOCK,
            None => exit_codes::CRASH,
        }
    }
}

/// Read a guidance request from a JSON file.
pub fn load_request(path: &Path) -> Result<GuidanceRequest> {
    let content = fs::read_to_string(path).map_err(|e| GuidanceError::storage(path, e))?;
    let request = serde_json::from_str(&content)
        .map_err(|e| GuidanceError::invalid_input(format!("{}: {}", path.display(), e)))?;
    Ok(request)
}

/// The evaluate command implementation.
pub struct EvaluateCommand<R: GateRepository> {
    pipeline: QualityPipeline<R>,
}

impl<R: GateRepository> EvaluateCommand<R> {
    /// Create a new evaluate command.
    pub fn new(repository: R, config: &Config) -> Self {
        Self {
            pipeline: QualityPipeline::from_config(repository, config),
        }
    }

    /// Run the evaluate command.
    pub fn run(&self, request: &GuidanceRequest, _options: &EvaluateOptions) -> EvaluateOutput {
        match self.pipeline.run(request) {
            Ok(decision) => EvaluateOutput::success(decision),
            Err(e) => EvaluateOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &EvaluateOutput, options: &EvaluateOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &EvaluateOutput) -> String {
        let Some(decision) = &output.decision else {
            return format!(
                "Evaluation failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = Vec::new();
        let verdict = if decision.overall_pass { "PASS" } else { "BLOCK" };
        lines.push(format!("Decision: {}", verdict));
        lines.push(String::new());

        lines.push(format!("Gates triggered: {}", decision.triggered_gates.len()));
        for gate in &decision.triggered_gates {
            lines.push(format!(
                "  [{}] {} {}: {}",
                gate.severity, gate.selector_type, gate.selector_key, gate.guidance_text
            ));
        }

        let grounding = &decision.grounding;
        let total = grounding.total_claims();
        lines.push(format!(
            "Grounding: {:.2} ({} of {} claims grounded)",
            grounding.grounding_score,
            total - grounding.ungrounded_claims.len(),
            total
        ));
        for claim in &grounding.ungrounded_claims {
            lines.push(format!("  ungrounded: \"{}\"", claim.text));
        }

        let rules = &decision.rule_check;
        lines.push(format!(
            "Rules: {} (confidence {:.2})",
            if rules.passed { "passed" } else { "failed" },
            rules.confidence
        ));
        for issue in &rules.issues {
            lines.push(format!("  [{}] {}: {}", issue.severity, issue.code, issue.message));
        }

        if !decision.risk_flags.is_empty() {
            lines.push("Risk flags:".to_string());
            for flag in &decision.risk_flags {
                lines.push(format!("  [{}] {}", flag.level, flag.reason));
            }
        }

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DraftAnswer, KnowledgeChunk, LearnerProfile};
    use crate::storage::traits::tests::sample_gates;
    use crate::storage::MemoryGateRepository;
    use tempfile::TempDir;

    fn command() -> EvaluateCommand<MemoryGateRepository> {
        let repo = MemoryGateRepository::with_gates(sample_gates()).unwrap();
        EvaluateCommand::new(repo, &Config::default())
    }

    fn request(grade: u8) -> GuidanceRequest {
        GuidanceRequest::new(
            LearnerProfile::new(grade)
                .with_subject("Maths Literacy")
                .with_interest("Engineering"),
            "",
            DraftAnswer::new("Engineering at UCT requires pure Mathematics and an APS of 35."),
            vec![KnowledgeChunk::new(
                "c1",
                "Engineering at UCT requires pure Mathematics and an APS of 35.",
            )],
        )
    }

    #[test]
    fn test_passing_decision_approves() {
        let output = command().run(&request(9), &EvaluateOptions::default());
        assert!(output.success);
        assert_eq!(output.exit_code(), exit_codes::APPROVE);
    }

    #[test]
    fn test_blocking_gate_exits_block() {
        let output = command().run(&request(10), &EvaluateOptions::default());
        assert!(output.success);
        assert_eq!(output.exit_code(), exit_codes::BLOCK);
    }

    #[test]
    fn test_error_exits_crash() {
        let mut req = request(10);
        req.draft_answer = DraftAnswer::default();
        let output = command().run(&req, &EvaluateOptions::default());
        assert!(!output.success);
        assert!(output.decision.is_none());
        assert_eq!(output.exit_code(), exit_codes::CRASH);
    }

    #[test]
    fn test_human_readable_output() {
        let cmd = command();
        let output = cmd.run(&request(10), &EvaluateOptions::default());
        let text = cmd.format_output(&output, &EvaluateOptions::default());

        assert!(text.starts_with("Decision: BLOCK"));
        assert!(text.contains("[block] subject Maths Literacy"));
        assert!(text.contains("Grounding: 1.00 (1 of 1 claims grounded)"));
    }

    #[test]
    fn test_json_and_quiet_output() {
        let cmd = command();
        let output = cmd.run(&request(10), &EvaluateOptions::default());

        let json = cmd.format_output(
            &output,
            &EvaluateOptions {
                json: true,
                quiet: false,
            },
        );
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["decision"]["overallPass"], false);

        let quiet = cmd.format_output(
            &output,
            &EvaluateOptions {
                json: false,
                quiet: true,
            },
        );
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_load_request() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("request.json");
        fs::write(&path, serde_json::to_string(&request(10)).unwrap()).unwrap();

        let loaded = load_request(&path).unwrap();
        assert_eq!(loaded, request(10));
    }

    #[test]
    fn test_load_request_rejects_malformed_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("request.json");
        fs::write(&path, "{\"query\": 3}").unwrap();

        let err = load_request(&path).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_load_request_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_request(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GuidanceError::Storage { .. }));
    }
}
