//! Validation of step replies.
//!
//! A reply is accepted only as a JSON object with exactly the fields `step`
//! and `content`, naming the expected step, with non-empty content.

use persona_core::{Step, StepResult};
use serde::Deserialize;

use crate::generation::GenerationError;

/// What the orchestrator learns from one generation attempt.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Valid(StepResult),
    /// The reply arrived but broke the step contract; the message says how.
    SchemaViolation(String),
    TransportFailure(GenerationError),
}

/// Affiliate link expectations for the result step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoPolicy<'a> {
    /// The link must appear in the content.
    Require(&'a str),
    /// The link must not appear in the content.
    Forbid(&'a str),
}

impl<'a> PromoPolicy<'a> {
    pub fn new(triggered: bool, affiliate_url: &'a str) -> Self {
        if triggered {
            Self::Require(affiliate_url)
        } else {
            Self::Forbid(affiliate_url)
        }
    }

    fn check(self, content: &str) -> Result<(), String> {
        match self {
            Self::Require(url) if !content.contains(url) => {
                Err("the response must include the exact discount link".to_string())
            }
            Self::Forbid(url) if content.contains(url) => {
                Err("the response must not include the discount link".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StepReply {
    step: Step,
    content: String,
}

/// Checks `reply` against the contract for `expected`.
///
/// The promo policy is only enforced on the result step, which is the one
/// whose content is committed.
pub fn validate_reply(expected: Step, reply: &str, promo: PromoPolicy<'_>) -> StepOutcome {
    let parsed: StepReply = match serde_json::from_str(reply.trim()) {
        Ok(parsed) => parsed,
        Err(err) => {
            return StepOutcome::SchemaViolation(format!(
                "reply is not a {{\"step\", \"content\"}} JSON object: {err}"
            ));
        }
    };

    if parsed.step != expected {
        return StepOutcome::SchemaViolation(format!(
            "expected step '{}', got '{}'",
            expected, parsed.step
        ));
    }

    if parsed.content.trim().is_empty() {
        return StepOutcome::SchemaViolation("content is empty".to_string());
    }

    if expected == Step::Result {
        if let Err(violation) = promo.check(&parsed.content) {
            return StepOutcome::SchemaViolation(violation);
        }
    }

    StepOutcome::Valid(StepResult::new(expected, parsed.content))
}
