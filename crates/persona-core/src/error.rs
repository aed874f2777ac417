//! Error types for the persona chat system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::Step;

/// Coarse classification of a failure, as surfaced to HTTP callers.
///
/// Only `Upstream` failures are ever worth retrying, and only those the
/// server marked retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The request itself was unusable (empty or missing user content).
    Validation,
    /// The generation service answered with something outside the step schema.
    Parse,
    /// Transport failure, timeout or quota exhaustion at the generation service.
    Upstream,
    /// Anything else.
    Unknown,
}

/// A shared error type for the entire persona chat workspace.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ChatError {
    /// Empty or missing user content
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generation output failed the step schema
    #[error("Parse error at step '{step}': {message}")]
    Parse { step: Step, message: String },

    /// Transport, timeout or quota failure from the generation service
    #[error("Upstream error: {message}")]
    Upstream { message: String, retryable: bool },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Parse error for the given step
    pub fn parse(step: Step, message: impl Into<String>) -> Self {
        Self::Parse {
            step,
            message: message.into(),
        }
    }

    /// Creates an Upstream error
    pub fn upstream(message: impl Into<String>, retryable: bool) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable,
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Rebuilds an error from a kind and message received over the wire.
    ///
    /// Parse errors lose their step on the wire, so they are attributed to the
    /// final step, which is the one whose content the caller was waiting for.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Parse => Self::Parse {
                step: Step::Result,
                message,
            },
            ErrorKind::Upstream => Self::Upstream {
                message,
                retryable: true,
            },
            ErrorKind::Unknown => Self::Internal(message),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Classifies this error into the coarse taxonomy exposed to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Config(_) | Self::Io { .. } | Self::Serialization { .. } | Self::Internal(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a Parse error
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Check if this is an Upstream error
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_the_taxonomy() {
        assert_eq!(ChatError::validation("empty").kind(), ErrorKind::Validation);
        assert_eq!(ChatError::parse(Step::Think, "bad").kind(), ErrorKind::Parse);
        assert_eq!(ChatError::upstream("timeout", true).kind(), ErrorKind::Upstream);
        assert_eq!(ChatError::config("missing key").kind(), ErrorKind::Unknown);
        assert_eq!(ChatError::internal("boom").kind(), ErrorKind::Unknown);
    }

    #[test]
    fn permanent_upstream_failures_are_not_retryable() {
        assert!(ChatError::upstream("503", true).is_retryable());
        assert!(!ChatError::upstream("400 bad key", false).is_retryable());
        assert!(!ChatError::parse(Step::Result, "bad").is_retryable());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ErrorKind::Upstream).unwrap();
        assert_eq!(json, "\"upstream\"");
    }

    #[test]
    fn from_kind_round_trips_classification() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::Parse,
            ErrorKind::Upstream,
            ErrorKind::Unknown,
        ] {
            assert_eq!(ChatError::from_kind(kind, "msg").kind(), kind);
        }
    }

    #[test]
    fn parse_error_names_the_step() {
        let err = ChatError::parse(Step::Validate, "missing field `content`");
        assert_eq!(
            err.to_string(),
            "Parse error at step 'validate': missing field `content`"
        );
    }
}
