//! Chain-of-thought step types.
//!
//! Every user turn is answered through five fixed steps. The orchestrator
//! produces one [`StepResult`] per step and bundles them into an
//! [`OrchestratorResult`], whose constructor enforces the ordering invariants.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::{ChatError, Result};

/// One of the five stages of the chain-of-thought protocol.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Step {
    /// Analyze the user query.
    #[serde(alias = "analyse")]
    Analyze,
    /// Think about how to respond in the persona's style.
    Think,
    /// Draft the response.
    Output,
    /// Check the draft against the persona.
    Validate,
    /// The committed answer.
    Result,
}

impl Step {
    /// The canonical order of the protocol.
    pub const ALL: [Step; 5] = [
        Step::Analyze,
        Step::Think,
        Step::Output,
        Step::Validate,
        Step::Result,
    ];

    /// Wire name of the step.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Zero-based position of the step in the protocol.
    pub fn position(self) -> usize {
        match self {
            Step::Analyze => 0,
            Step::Think => 1,
            Step::Output => 2,
            Step::Validate => 3,
            Step::Result => 4,
        }
    }

    /// Steps whose prompt changes when a promo trigger fired.
    pub fn is_promo_sensitive(self) -> bool {
        matches!(self, Step::Output | Step::Validate | Step::Result)
    }

    /// Emoji shown next to the step while it is replayed.
    pub fn emoji(self) -> &'static str {
        match self {
            Step::Analyze => "🔍",
            Step::Think => "🧠",
            Step::Output => "✏️",
            Step::Validate => "✅",
            Step::Result => "🎯",
        }
    }

    /// Human-readable progress line for the step.
    pub fn description(self) -> &'static str {
        match self {
            Step::Analyze => "Analyzing your question...",
            Step::Think => "Thinking through a solution...",
            Step::Output => "Crafting a detailed response...",
            Step::Validate => "Double-checking accuracy...",
            Step::Result => "Finalizing the perfect answer...",
        }
    }
}

/// The validated output of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub content: String,
}

impl StepResult {
    pub fn new(step: Step, content: impl Into<String>) -> Self {
        Self {
            step,
            content: content.into(),
        }
    }
}

/// All five steps of one request plus the answer to commit.
///
/// Instances can only be built through [`OrchestratorResult::from_steps`]
/// (deserialization goes through the same checks), so holding one means:
/// exactly five steps in canonical order, and a non-empty `final_response`
/// equal to the last step's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawOrchestratorResult")]
pub struct OrchestratorResult {
    steps: Vec<StepResult>,
    final_response: String,
}

impl OrchestratorResult {
    /// Assembles a result from validated steps.
    ///
    /// # Errors
    ///
    /// Returns a Parse error if the steps are not exactly the canonical five
    /// or the final step is empty.
    pub fn from_steps(steps: Vec<StepResult>) -> Result<Self> {
        if steps.len() != Step::ALL.len() {
            return Err(ChatError::parse(
                Step::Result,
                format!("expected {} steps, got {}", Step::ALL.len(), steps.len()),
            ));
        }

        for (expected, actual) in Step::ALL.iter().zip(&steps) {
            if actual.step != *expected {
                return Err(ChatError::parse(
                    *expected,
                    format!("expected step '{}', found '{}'", expected, actual.step),
                ));
            }
        }

        let final_response = steps[steps.len() - 1].content.clone();
        if final_response.trim().is_empty() {
            return Err(ChatError::parse(Step::Result, "final response is empty"));
        }

        Ok(Self {
            steps,
            final_response,
        })
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// The steps shown as transient indicators (all but the last).
    pub fn thinking_steps(&self) -> &[StepResult] {
        &self.steps[..self.steps.len() - 1]
    }

    pub fn final_response(&self) -> &str {
        &self.final_response
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrchestratorResult {
    steps: Vec<StepResult>,
    final_response: String,
}

impl TryFrom<RawOrchestratorResult> for OrchestratorResult {
    type Error = ChatError;

    fn try_from(raw: RawOrchestratorResult) -> Result<Self> {
        let result = Self::from_steps(raw.steps)?;
        if result.final_response != raw.final_response {
            return Err(ChatError::parse(
                Step::Result,
                "finalResponse does not match the result step",
            ));
        }
        Ok(result)
    }
}
