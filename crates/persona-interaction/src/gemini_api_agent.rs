//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Every call sends the complete turn list; no conversation state is held by
//! the agent or relied upon at the provider.

use async_trait::async_trait;
use persona_core::config::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GenerationConfig};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::generation::{GenerationClient, GenerationError, Turn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Generation client that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiApiAgent {
    /// Creates a new agent with the provided API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Uses a preconfigured HTTP client (connection pool shared with the process).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The key travels in a header so it never appears in URLs or transport errors.
    fn build_request(&self, body: &GenerateContentRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/{model}:generateContent", self.base_url, model = self.model);

        self.client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let response = self
            .build_request(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::Transport {
                status_code: None,
                message: format!("Failed to decode Gemini response: {err}"),
                is_retryable: false,
            }
        })?;

        Ok(extract_text_response(parsed))
    }
}

#[async_trait]
impl GenerationClient for GeminiApiAgent {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send_turn(
        &self,
        history: &[Turn],
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::new(history, prompt, config);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfigPayload,
}

impl GenerateContentRequest {
    fn new(history: &[Turn], prompt: &str, config: &GenerationConfig) -> Self {
        let mut contents: Vec<Content> = history.iter().map(Content::from).collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        });

        Self {
            contents,
            generation_config: GenerationConfigPayload::from(config),
        }
    }
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigPayload {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    response_mime_type: String,
}

impl From<&GenerationConfig> for GenerationConfigPayload {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            response_mime_type: config.response_mime_type.clone(),
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn map_transport_error(err: reqwest::Error) -> GenerationError {
    let err = err.without_url();
    if err.is_timeout() {
        // The reqwest client carries no timeout of its own unless one was
        // injected through `with_http_client`; the orchestrator bound applies otherwise.
        return GenerationError::Transport {
            status_code: None,
            message: format!("Gemini API request timed out: {err}"),
            is_retryable: true,
        };
    }

    GenerationError::Transport {
        status_code: err.status().map(|s| s.as_u16()),
        message: format!("Gemini API request failed: {err}"),
        is_retryable: err.is_connect(),
    }
}

/// Missing text (e.g. a safety block) comes back as an empty reply, which the
/// step validator rejects like any other off-schema output.
fn extract_text_response(response: GenerateContentResponse) -> String {
    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next());
    let finish_reason = candidate
        .as_ref()
        .and_then(|candidate| candidate.finish_reason.clone());

    match candidate
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
    {
        Some(text) => text,
        None => {
            tracing::warn!(
                finish_reason = finish_reason.as_deref().unwrap_or("none"),
                "Gemini API returned no text in the response candidates"
            );
            String::new()
        }
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return GenerationError::QuotaExceeded {
            message,
            retry_after,
        };
    }

    let is_retryable = matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    GenerationError::Transport {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // Retry-After HTTP-date parsing is omitted for simplicity
    None
}
