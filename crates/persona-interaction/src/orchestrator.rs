//! Five-step chain-of-thought orchestration.
//!
//! Each request opens a fresh session: the handshake, the prior conversation
//! and then one prompt per step, every call re-sending the full turn list.

use std::borrow::Cow;
use std::sync::Arc;

use persona_core::config::OrchestratorSettings;
use persona_core::persona::PersonaConfig;
use persona_core::{ChatError, Message, MessageRole, OrchestratorResult, Result, Step, StepResult};

use crate::generation::{GenerationClient, GenerationError, Turn};
use crate::prompt::{PromptBuilder, detect_promo_trigger};
use crate::schema::{PromoPolicy, StepOutcome, validate_reply};

/// Drives the analyze, think, output, validate and result steps for one persona.
pub struct StepOrchestrator {
    client: Arc<dyn GenerationClient>,
    prompts: PromptBuilder,
    settings: OrchestratorSettings,
}

impl StepOrchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, settings: OrchestratorSettings) -> Self {
        Self {
            client,
            prompts: PromptBuilder::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Answers the last user message of `messages` as `persona`.
    ///
    /// # Errors
    ///
    /// - `Validation` if the last message is missing, not from the user or
    ///   blank. No generation call is made in that case.
    /// - `Parse` if a step reply still breaks its contract after the
    ///   configured reprompts.
    /// - `Upstream` on transport failure, quota exhaustion or timeout.
    pub async fn run(
        &self,
        persona: &PersonaConfig,
        messages: &[Message],
    ) -> Result<OrchestratorResult> {
        let (query, prior) = split_query(messages)?;
        let triggered = detect_promo_trigger(persona, query);

        tracing::info!(
            target: "orchestrator",
            "[{}] Starting run via {} ({} prior messages, promo: {})",
            persona.id,
            self.client.name(),
            prior.len(),
            triggered
        );

        let mut history: Vec<Turn> = self.prompts.build_handshake(persona).into();
        history.extend(prior_turns(prior));

        let promo = PromoPolicy::new(triggered, &persona.affiliate_url);
        let mut steps = Vec::with_capacity(Step::ALL.len());

        for step in Step::ALL {
            let prompt = self
                .prompts
                .build_step_prompt(persona, step, query, triggered)?;
            let result = self.run_step(persona, step, &history, &prompt, promo).await?;

            history.push(Turn::user(prompt));
            history.push(Turn::model(
                serde_json::to_string(&result)
                    .map_err(|err| ChatError::internal(format!("Failed to encode step: {err}")))?,
            ));
            steps.push(result);
        }

        let result = OrchestratorResult::from_steps(steps)?;
        tracing::info!(
            target: "orchestrator",
            "[{}] Run complete ({} chars)",
            persona.id,
            result.final_response().len()
        );
        Ok(result)
    }

    /// Runs one step, reprompting on schema violations up to the configured bound.
    ///
    /// Rejected replies never enter the history.
    async fn run_step(
        &self,
        persona: &PersonaConfig,
        step: Step,
        history: &[Turn],
        base_prompt: &str,
        promo: PromoPolicy<'_>,
    ) -> Result<StepResult> {
        let mut prompt = Cow::Borrowed(base_prompt);
        let mut reprompts = 0;

        loop {
            match self.attempt(persona, step, history, &prompt, promo).await {
                StepOutcome::Valid(result) => {
                    tracing::debug!(target: "orchestrator", "[{}] Step '{}' accepted", persona.id, step);
                    return Ok(result);
                }
                StepOutcome::TransportFailure(err) => {
                    tracing::warn!(
                        target: "orchestrator",
                        "[{}] Step '{}' failed upstream: {}",
                        persona.id,
                        step,
                        err
                    );
                    return Err(err.into());
                }
                StepOutcome::SchemaViolation(violation) => {
                    if reprompts >= self.settings.max_reprompts {
                        tracing::warn!(
                            target: "orchestrator",
                            "[{}] Step '{}' rejected, giving up: {}",
                            persona.id,
                            step,
                            violation
                        );
                        return Err(ChatError::parse(step, violation));
                    }
                    reprompts += 1;
                    tracing::warn!(
                        target: "orchestrator",
                        "[{}] Step '{}' rejected, reprompt {}/{}: {}",
                        persona.id,
                        step,
                        reprompts,
                        self.settings.max_reprompts,
                        violation
                    );
                    prompt = Cow::Owned(self.prompts.build_reprompt(step, base_prompt, &violation)?);
                }
            }
        }
    }

    async fn attempt(
        &self,
        persona: &PersonaConfig,
        step: Step,
        history: &[Turn],
        prompt: &str,
        promo: PromoPolicy<'_>,
    ) -> StepOutcome {
        let timeout = self.settings.call_timeout();
        let call = self.client.send_turn(history, prompt, &persona.generation);

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(reply)) => validate_reply(step, &reply, promo),
            Ok(Err(err)) => StepOutcome::TransportFailure(err),
            Err(_) => StepOutcome::TransportFailure(GenerationError::Timeout(timeout)),
        }
    }
}

/// Splits the conversation into the query to answer and what came before it.
fn split_query(messages: &[Message]) -> Result<(&str, &[Message])> {
    let Some((last, prior)) = messages.split_last() else {
        return Err(ChatError::validation("No messages provided"));
    };
    if last.role != MessageRole::User {
        return Err(ChatError::validation(
            "The last message must come from the user",
        ));
    }
    if last.content.trim().is_empty() {
        return Err(ChatError::validation("The last message is empty"));
    }
    Ok((last.content.as_str(), prior))
}

/// Earlier messages as session turns. Local system messages and blank
/// entries are dropped.
fn prior_turns(messages: &[Message]) -> impl Iterator<Item = Turn> + '_ {
    messages
        .iter()
        .filter(|message| !message.content.trim().is_empty())
        .filter_map(|message| match message.role {
            MessageRole::User => Some(Turn::user(message.content.clone())),
            MessageRole::Assistant => Some(Turn::model(message.content.clone())),
            MessageRole::System => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_query_rejects_unusable_conversations() {
        assert!(split_query(&[]).unwrap_err().is_validation());
        assert!(
            split_query(&[Message::assistant("hi", "hitesh", 1)])
                .unwrap_err()
                .is_validation()
        );
        assert!(
            split_query(&[Message::user(" \n\t", 1)])
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn split_query_returns_last_user_message() {
        let messages = [
            Message::user("first", 1),
            Message::assistant("answer", "piyush", 2),
            Message::user("second", 3),
        ];
        let (query, prior) = split_query(&messages).unwrap();
        assert_eq!(query, "second");
        assert_eq!(prior.len(), 2);
    }

    #[test]
    fn prior_turns_map_roles_and_skip_system() {
        let messages = [
            Message::user("q1", 1),
            Message::system("Sorry, there was an error", 2),
            Message::assistant("a1", "hitesh", 3),
            Message::user("", 4),
        ];
        let turns: Vec<Turn> = prior_turns(&messages).collect();
        assert_eq!(turns, vec![Turn::user("q1"), Turn::model("a1")]);
    }
}
