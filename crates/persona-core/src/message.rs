//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including roles and message content.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
    /// Locally generated message (errors); never sent to the generation service.
    System,
}

/// A single message in a conversation history.
///
/// Each message has a role, content, the persona that answered (assistant
/// messages only) and a timestamp in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Persona id that produced this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            persona: None,
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, persona: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            persona: Some(persona.into()),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            persona: None,
            timestamp,
        }
    }

    /// Returns true if this message belongs in the history sent to the server.
    pub fn is_outbound(&self) -> bool {
        self.role != MessageRole::System
    }
}
