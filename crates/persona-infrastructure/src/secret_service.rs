//! Secret service implementation.
//!
//! Resolves the Gemini API key from `$GOOGLE_API_KEY` first and from
//! `secret.json` otherwise.

use std::path::{Path, PathBuf};

use persona_core::ChatError;
use persona_core::config::{GeminiSecret, SecretConfig};
use persona_core::secret::SecretService;

use crate::paths::SECRET_FILE;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Secret service backed by the environment and a JSON file.
#[derive(Debug, Clone)]
pub struct SecretServiceImpl {
    secret_path: PathBuf,
    env_api_key: Option<String>,
}

impl SecretServiceImpl {
    /// Reads `secret.json` from the directory holding `config_path`, with
    /// `$GOOGLE_API_KEY` taking precedence.
    pub fn beside_config(config_path: &Path) -> Self {
        Self::new(
            config_path.with_file_name(SECRET_FILE),
            std::env::var(API_KEY_ENV).ok(),
        )
    }

    /// Explicit construction, mainly for tests.
    pub fn new(secret_path: impl Into<PathBuf>, env_api_key: Option<String>) -> Self {
        Self {
            secret_path: secret_path.into(),
            env_api_key: env_api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    async fn load_file(&self) -> persona_core::Result<SecretConfig> {
        match tokio::fs::read_to_string(&self.secret_path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                // The parse error may quote file content, so keep it out of the message.
                tracing::debug!(line = e.line(), column = e.column(), "secret.json is malformed");
                ChatError::config(format!(
                    "Failed to parse secret file at {}",
                    self.secret_path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SecretConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> persona_core::Result<SecretConfig> {
        let mut config = self.load_file().await?;

        if let Some(api_key) = &self.env_api_key {
            let model_name = config.gemini.and_then(|gemini| gemini.model_name);
            config.gemini = Some(GeminiSecret {
                api_key: api_key.clone(),
                model_name,
            });
        }

        Ok(config)
    }
}
