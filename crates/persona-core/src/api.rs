//! HTTP wire types shared by the server and its clients.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ErrorKind};
use crate::message::Message;

/// Body of `POST /chat/{personaId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full conversation; the last entry is the new user query.
    pub messages: Vec<Message>,
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Absent when talking to a server that predates error kinds.
    #[serde(default = "unknown_kind")]
    pub kind: ErrorKind,
    /// Set on upstream failures; absent means the kind alone decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

fn unknown_kind() -> ErrorKind {
    ErrorKind::Unknown
}

impl From<&ChatError> for ErrorResponse {
    fn from(err: &ChatError) -> Self {
        Self {
            error: format!("Failed to process request: {}", err),
            kind: err.kind(),
            retryable: err.is_upstream().then(|| err.is_retryable()),
        }
    }
}

impl From<ErrorResponse> for ChatError {
    fn from(response: ErrorResponse) -> Self {
        match (response.kind, response.retryable) {
            (ErrorKind::Upstream, Some(retryable)) => ChatError::upstream(response.error, retryable),
            (kind, _) => ChatError::from_kind(kind, response.error),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
