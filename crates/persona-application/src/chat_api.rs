//! Client for the persona chat HTTP service.

use async_trait::async_trait;
use persona_core::api::{ChatRequest, ErrorResponse};
use persona_core::persona::PersonaSummary;
use persona_core::{ChatError, Message, OrchestratorResult, Result, Step};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// The server as seen from a client.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sends the conversation to `persona_id` and returns the validated steps.
    async fn send(&self, persona_id: &str, messages: &[Message]) -> Result<OrchestratorResult>;

    async fn list_personas(&self) -> Result<Vec<PersonaSummary>>;
}

/// [`ChatApi`] over HTTP with reqwest.
#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ChatError::upstream(format!("Failed to read response body: {err}"), true))?;

        if status.is_success() {
            // OrchestratorResult re-checks its invariants while deserializing.
            return serde_json::from_str(&body)
                .map_err(|err| ChatError::parse(Step::Result, format!("Malformed response: {err}")));
        }

        Err(error_from_status(status, &body))
    }
}

fn error_from_status(status: StatusCode, body: &str) -> ChatError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) => response.into(),
        Err(_) if status.is_server_error() => {
            ChatError::upstream(format!("HTTP error! status: {}", status.as_u16()), true)
        }
        Err(_) => ChatError::internal(format!("HTTP error! status: {}", status.as_u16())),
    }
}

fn map_transport_error(err: reqwest::Error) -> ChatError {
    ChatError::upstream(format!("Request to chat server failed: {err}"), true)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send(&self, persona_id: &str, messages: &[Message]) -> Result<OrchestratorResult> {
        let url = format!("{}/chat/{}", self.base_url, persona_id);
        let request = ChatRequest {
            messages: messages.to_vec(),
        };

        tracing::debug!(target: "chat_api", "POST {} ({} messages)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        Self::read_body(response).await
    }

    async fn list_personas(&self) -> Result<Vec<PersonaSummary>> {
        let url = format!("{}/personas", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        Self::read_body(response).await
    }
}
