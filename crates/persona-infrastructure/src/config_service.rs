//! Loads `config.toml` and resolves the persona set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use persona_core::config::{ConfigRoot, GeminiSettings, OrchestratorSettings, ServerSettings};
use persona_core::persona::{PersonaConfig, get_default_presets};
use persona_core::{ChatError, Result};

use crate::paths::{CONFIG_PATH_ENV, PersonaChatPaths};

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub gemini: GeminiSettings,
    pub orchestrator: OrchestratorSettings,
    pub personas: Vec<PersonaConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_root(ConfigRoot::default())
    }
}

impl AppConfig {
    /// Applies defaults: an empty `[[persona]]` list means the built-in presets.
    fn from_root(root: ConfigRoot) -> Self {
        let personas = if root.personas.is_empty() {
            get_default_presets()
        } else {
            root.personas
        };

        Self {
            server: root.server,
            gemini: root.gemini,
            orchestrator: root.orchestrator,
            personas,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.orchestrator.call_timeout_secs == 0 {
            return Err(ChatError::config(
                "orchestrator call_timeout_secs must be greater than zero",
            ));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if persona.id.trim().is_empty() {
                return Err(ChatError::config("persona id must not be empty"));
            }
            if !seen.insert(persona.id.as_str()) {
                return Err(ChatError::config(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
            // An empty phrase is a substring of every query.
            if persona
                .promo_trigger_phrases
                .iter()
                .any(|phrase| phrase.trim().is_empty())
            {
                return Err(ChatError::config(format!(
                    "persona '{}' has an empty promo trigger phrase",
                    persona.id
                )));
            }
            if persona.affiliate_url.trim().is_empty() {
                return Err(ChatError::config(format!(
                    "persona '{}' has an empty affiliate_url",
                    persona.id
                )));
            }
        }
        Ok(())
    }
}

/// Reads the TOML configuration file.
///
/// A missing file is not an error: the defaults (including the built-in
/// personas) are used instead.
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Uses an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the path from `$PERSONA_CHAT_CONFIG`, falling back to the
    /// platform config directory.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Ok(Self::with_path(path)),
            None => Ok(Self::with_path(PersonaChatPaths::default().config_file()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<AppConfig> {
        let root = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => toml::from_str::<ConfigRoot>(&content).map_err(|e| {
                ChatError::config(format!(
                    "Failed to parse configuration file at {}: {}",
                    self.path.display(),
                    e
                ))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "No configuration file found, using defaults"
                );
                ConfigRoot::default()
            }
            Err(err) => return Err(err.into()),
        };

        let config = AppConfig::from_root(root);
        config.validate()?;

        tracing::debug!(
            path = %self.path.display(),
            personas = config.personas.len(),
            "Configuration loaded"
        );
        Ok(config)
    }
}
