//! Prompt construction for the handshake and the five step turns.

use minijinja::{Environment, context};
use persona_core::persona::PersonaConfig;
use persona_core::{ChatError, Result, Step};

use crate::generation::Turn;

const ANALYZE_TEMPLATE: &str = r#"User query: "{{ query }}". First step: analyze the query and output as JSON: { "step": "analyze", "content": "your analysis here" }"#;

const THINK_TEMPLATE: &str = r#"Based on your analysis, now think about how to respond to this query in {{ short_name }}'s style. Output as JSON: { "step": "think", "content": "your thought process here" }"#;

const OUTPUT_TEMPLATE: &str = r#"Now create the final response in {{ possessive_style }} style, based on your thinking.{% if triggered %} Remember to enthusiastically recommend the GenAI cohort course and include the 10% off link.{% endif %} Output as JSON: { "step": "output", "content": "your final response here" }"#;

const VALIDATE_TEMPLATE: &str = r#"Verify that your response stays true to {{ short_name }}'s persona and teaching style.{% if triggered %} Make sure you've included the GenAI cohort course recommendation with the discount link.{% endif %} Output as JSON: { "step": "validate", "content": "your validation here" }"#;

const RESULT_TEMPLATE: &str = r#"Now provide the final result that fully embodies {{ possessive_style }} teaching style.{% if triggered %} Ensure you have included an enthusiastic recommendation for the GenAI cohort course with the 10% discount link: {{ affiliate_url }}{% endif %} Output as JSON: { "step": "result", "content": "final response" }"#;

const REPROMPT_TEMPLATE: &str = r#"{{ base }}

Your previous reply was rejected: {{ violation }}. Reply again with exactly one JSON object of the form { "step": "{{ step }}", "content": "..." } and nothing else."#;

/// Renders every prompt the orchestrator sends.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // The templates are compile-time constants; a syntax error here is a bug
        // and surfaces on first render as an Internal error.
        for (name, source) in [
            ("analyze", ANALYZE_TEMPLATE),
            ("think", THINK_TEMPLATE),
            ("output", OUTPUT_TEMPLATE),
            ("validate", VALIDATE_TEMPLATE),
            ("result", RESULT_TEMPLATE),
            ("reprompt", REPROMPT_TEMPLATE),
        ] {
            if let Err(err) = env.add_template(name, source) {
                tracing::error!("Invalid prompt template '{}': {}", name, err);
            }
        }
        Self { env }
    }

    /// The two turns that open every session: the persona instructions and
    /// the persona's canned acknowledgement.
    pub fn build_handshake(&self, persona: &PersonaConfig) -> [Turn; 2] {
        [
            Turn::user(format!(
                "Please adopt the {} persona as per these instructions: {}",
                persona.display_name, persona.system_prompt
            )),
            Turn::model(persona.handshake_ack.clone()),
        ]
    }

    /// Renders the prompt for `step`.
    ///
    /// Only the analyze prompt carries the query; later steps rely on the
    /// session history.
    pub fn build_step_prompt(
        &self,
        persona: &PersonaConfig,
        step: Step,
        query: &str,
        triggered: bool,
    ) -> Result<String> {
        self.render(
            step.as_str(),
            context! {
                query => query,
                short_name => persona.short_name.as_str(),
                possessive_style => persona.possessive_style(),
                affiliate_url => persona.affiliate_url.as_str(),
                triggered => triggered && step.is_promo_sensitive(),
            },
        )
    }

    /// Re-asks for `step` after its reply was rejected.
    pub fn build_reprompt(&self, step: Step, base: &str, violation: &str) -> Result<String> {
        self.render(
            "reprompt",
            context! {
                base => base,
                violation => violation,
                step => step.as_str(),
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|err| ChatError::internal(format!("Failed to render prompt '{name}': {err}")))
    }
}

/// True if the query mentions any of the persona's trigger phrases.
///
/// Plain case-insensitive substring matching: "gen aid" contains "gen ai"
/// and therefore triggers.
pub fn detect_promo_trigger(persona: &PersonaConfig, query: &str) -> bool {
    let query = query.to_lowercase();
    persona
        .promo_trigger_phrases
        .iter()
        .any(|phrase| query.contains(&phrase.to_lowercase()))
}
