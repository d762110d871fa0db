//! Results of a refinement run.

use codeloop_llm::GeneratedOutputs;
use indexmap::IndexMap;
use serde::Serialize;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Every checked artifact reported the success message.
    AllSucceeded,
    /// `max_steps` ran out while some artifact still failed.
    StepBudgetExhausted,
}

/// Outcome of one artifact in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutcome {
    /// Success message, stderr, or conformance feedback.
    pub message: String,
    pub succeeded: bool,
    /// False when template validation rejected the content.
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: u32,
    pub all_succeeded: bool,
    pub outcomes: IndexMap<String, ArtifactOutcome>,
}

/// Best-known outputs plus enough detail for the caller to see what still fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefineOutput {
    pub status: Terminal,
    pub steps_taken: u32,
    /// Outputs of the last generation call.
    pub outputs: GeneratedOutputs,
    pub steps: Vec<StepReport>,
}

impl RefineOutput {
    /// Per-artifact outcomes of the final step.
    #[must_use]
    pub fn final_outcomes(&self) -> Option<&IndexMap<String, ArtifactOutcome>> {
        self.steps.last().map(|report| &report.outcomes)
    }

    /// Names of artifacts whose last outcome was not a success.
    #[must_use]
    pub fn failing(&self) -> Vec<&str> {
        self.final_outcomes()
            .map(|outcomes| {
                outcomes
                    .iter()
                    .filter(|(_, outcome)| !outcome.succeeded)
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.status == Terminal::AllSucceeded
    }
}
