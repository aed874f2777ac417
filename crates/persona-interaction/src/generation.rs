//! Contract with the external generation service.

use std::time::Duration;

use async_trait::async_trait;
use persona_core::ChatError;
use persona_core::config::GenerationConfig;
use thiserror::Error;

/// Who produced a turn in the generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One entry of the explicit, locally owned session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Failures a generation client can report.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("generation call timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation quota exhausted: {message}")]
    QuotaExceeded {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("generation request failed: {message}")]
    Transport {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::QuotaExceeded { .. } => true,
            GenerationError::Transport { is_retryable, .. } => *is_retryable,
        }
    }
}

impl From<GenerationError> for ChatError {
    fn from(err: GenerationError) -> Self {
        let retryable = err.is_retryable();
        ChatError::upstream(err.to_string(), retryable)
    }
}

/// A client for the hosted generation service.
///
/// Implementations must be stateless between calls: everything the service
/// should know is in `history` and `prompt`.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Sends `prompt` as the next user turn after `history` and returns the
    /// model's text reply.
    async fn send_turn(
        &self,
        history: &[Turn],
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::ErrorKind;

    #[test]
    fn every_generation_error_is_upstream() {
        let errors = [
            GenerationError::Timeout(Duration::from_secs(30)),
            GenerationError::QuotaExceeded {
                message: "RESOURCE_EXHAUSTED".into(),
                retry_after: None,
            },
            GenerationError::Transport {
                status_code: Some(400),
                message: "bad request".into(),
                is_retryable: false,
            },
        ];
        for err in errors {
            assert_eq!(ChatError::from(err).kind(), ErrorKind::Upstream);
        }
    }

    #[test]
    fn timeouts_and_quota_are_retryable() {
        assert!(GenerationError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(
            GenerationError::QuotaExceeded {
                message: String::new(),
                retry_after: Some(Duration::from_secs(5)),
            }
            .is_retryable()
        );
    }
}
