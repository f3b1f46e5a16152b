//! Gates command.
//!
//! Shows the gates the engine would trigger for a learner profile.

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::core::{LearnerProfile, TriggeredGate};
use crate::eligibility::{sort_by_severity, EligibilityGateEngine};
use crate::storage::GateRepository;

/// Options for the gates command.
#[derive(Debug, Clone, Default)]
pub struct GatesOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// List blocking gates first.
    pub by_severity: bool,
}

/// Output format for the gates command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatesOutput {
    /// Whether the gates could be checked.
    pub success: bool,
    /// Grade the profile was evaluated at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
    /// Triggered gates.
    pub gates: Vec<TriggeredGate>,
    /// Error message if the repository could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatesOutput {
    /// Create a successful output.
    pub fn success(grade: Option<u8>, gates: Vec<TriggeredGate>) -> Self {
        Self {
            success: true,
            grade,
            gates,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(grade: Option<u8>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            grade,
            gates: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The gates command implementation.
pub struct GatesCommand<R: GateRepository> {
    engine: EligibilityGateEngine<R>,
}

impl<R: GateRepository> GatesCommand<R> {
    /// Create a new gates command.
    pub fn new(repository: R, config: GateConfig) -> Self {
        Self {
            engine: EligibilityGateEngine::new(repository, config),
        }
    }

    /// Run the gates command.
    pub fn run(&self, profile: &LearnerProfile, options: &GatesOptions) -> GatesOutput {
        if let Err(e) = profile.validate() {
            return GatesOutput::failure(profile.grade, e.to_string());
        }

        match self.engine.evaluate(profile) {
            Ok(mut gates) => {
                if options.by_severity {
                    sort_by_severity(&mut gates);
                }
                let triggered = gates.iter().map(|g| g.to_triggered()).collect();
                GatesOutput::success(profile.grade, triggered)
            }
            Err(e) => GatesOutput::failure(profile.grade, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &GatesOutput, options: &GatesOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &GatesOutput) -> String {
        if !output.success {
            return format!(
                "Gates command failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.gates.is_empty() {
            return "No gates triggered.\n".to_string();
        }

        let mut lines = vec![format!("Gates triggered: {}\n", output.gates.len())];
        for gate in &output.gates {
            lines.push(format!(
                "  [{}] {} {}",
                gate.severity, gate.selector_type, gate.selector_key
            ));
            lines.push(format!("      {}", gate.guidance_text));
        }

        lines.join("\n") + "\n"
    }
}
