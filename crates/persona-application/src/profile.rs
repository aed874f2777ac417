//! Persona profile lookup (display name and avatar) for presentation.

use async_trait::async_trait;
use persona_core::persona::PersonaSummary;
use persona_core::{ChatError, Result};
use reqwest::Client;
use serde::Deserialize;

pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// How a persona is presented in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// A public profile as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn get_profile(&self, username: &str) -> Result<RemoteProfile>;
}

/// Looks profiles up with `GET {base}/users/{username}`.
#[derive(Clone)]
pub struct GitHubProfileLookup {
    client: Client,
    base_url: String,
}

impl Default for GitHubProfileLookup {
    fn default() -> Self {
        Self::new(GITHUB_API_BASE_URL)
    }
}

impl GitHubProfileLookup {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProfileLookup for GitHubProfileLookup {
    async fn get_profile(&self, username: &str) -> Result<RemoteProfile> {
        let url = format!("{}/users/{}", self.base_url, username);
        let response = self
            .client
            .get(&url)
            // GitHub rejects requests without a user agent.
            .header(
                reqwest::header::USER_AGENT,
                concat!("persona-chat/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await
            .map_err(|err| ChatError::upstream(format!("Profile lookup failed: {err}"), true))?;

        if !response.status().is_success() {
            return Err(ChatError::upstream(
                format!("Profile lookup for '{}' returned {}", username, response.status()),
                response.status().is_server_error(),
            ));
        }

        response
            .json::<RemoteProfile>()
            .await
            .map_err(|err| ChatError::internal(format!("Invalid profile response: {err}")))
    }
}

/// Resolves how `persona` is shown, falling back to its configured display
/// name when there is no lookup, no account, a failed lookup or an unnamed profile.
pub async fn resolve_profile(lookup: Option<&dyn ProfileLookup>, persona: &PersonaSummary) -> Profile {
    let fallback = Profile {
        display_name: persona.display_name.clone(),
        avatar_url: None,
    };
    let (Some(lookup), Some(username)) = (lookup, persona.github_username.as_deref()) else {
        return fallback;
    };

    match lookup.get_profile(username).await {
        Ok(remote) => Profile {
            display_name: remote
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(fallback.display_name),
            avatar_url: remote.avatar_url,
        },
        Err(err) => {
            tracing::warn!(target: "profile", "Using fallback profile for '{}': {}", persona.id, err);
            fallback
        }
    }
}
