//! Persona domain model.
//!
//! A persona is the voice that answers a conversation: its system prompt,
//! how it acknowledges the handshake, and which queries obligate it to share
//! its affiliate link.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

/// Static configuration of a chat persona. Immutable once loaded.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PersonaConfig {
    /// Route segment, e.g. `hitesh` in `/chat/hitesh`.
    pub id: String,
    /// Full name, used in the handshake and as the profile fallback.
    pub display_name: String,
    /// Name used inside step prompts ("in Hitesh's style").
    pub short_name: String,
    /// Optional qualifier for the persona's style, e.g. "Hinglish".
    #[serde(default)]
    pub style_qualifier: Option<String>,
    /// GitHub account used for the avatar lookup.
    #[serde(default)]
    pub github_username: Option<String>,
    pub system_prompt: String,
    /// Synthetic model reply that closes the handshake.
    pub handshake_ack: String,
    /// Lowercase phrases; any substring hit in a query triggers the promo.
    #[serde(default)]
    pub promo_trigger_phrases: BTreeSet<String>,
    pub affiliate_url: String,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl PersonaConfig {
    /// "Hitesh's Hinglish" or "Piyush's", used ahead of "style".
    pub fn possessive_style(&self) -> String {
        match &self.style_qualifier {
            Some(qualifier) => format!("{}'s {}", self.short_name, qualifier),
            None => format!("{}'s", self.short_name),
        }
    }
}

/// Public view of a persona, as listed by the server.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSummary {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub github_username: Option<String>,
}

impl From<&PersonaConfig> for PersonaSummary {
    fn from(persona: &PersonaConfig) -> Self {
        Self {
            id: persona.id.clone(),
            display_name: persona.display_name.clone(),
            github_username: persona.github_username.clone(),
        }
    }
}
