//! Unified path management for persona chat configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/persona-chat/      # Config directory (platform config dir)
//! ├── config.toml              # Server, orchestrator and persona configuration
//! └── secret.json              # API keys
//! ```

use std::path::{Path, PathBuf};

use persona_core::{ChatError, Result};

const APP_DIR: &str = "persona-chat";
const CONFIG_FILE: &str = "config.toml";
/// Secret file name, always next to `config.toml`.
pub const SECRET_FILE: &str = "secret.json";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "PERSONA_CHAT_CONFIG";

/// Resolves configuration paths, optionally rooted at a custom base directory.
#[derive(Debug, Clone, Default)]
pub struct PersonaChatPaths {
    base_dir: Option<PathBuf>,
}

impl PersonaChatPaths {
    /// Creates a resolver. `None` uses the platform config directory.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g. `~/.config/persona-chat/`).
    pub fn config_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| ChatError::config("Cannot find config directory")),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join(CONFIG_FILE))
    }
}
