use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Errors from one round trip to the completion service
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("failed to decode completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Role of a turn in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// Message in a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Request body for the chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Response body of the chat-completions endpoint.
///
/// Every level is optional so that a reachable service returning an odd but
/// well-formed document decodes successfully and is treated as "no content".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Response with a single choice carrying `content`
    #[cfg(test)]
    pub(crate) fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: Some(ChoiceMessage {
                    content: Some(content.into()),
                }),
            }],
        }
    }

    /// Text of the first generated message, if it has any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
            .filter(|content| !content.is_empty())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull a readable message out of an error body, preferring the
/// `{"error": {"message": ...}}` shape used by OpenAI-compatible services.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}

/// A service that turns a list of turns into generated text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// HTTP client for OpenAI-compatible chat-completion endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| CompletionError::Config(format!("invalid API key format: {}", e)))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        // No request timeout: a generation runs until the service answers or
        // the connection fails.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        let url = format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH);
        Ok(Self { client, url })
    }

    /// Build a client from configuration, reading the credential from the
    /// environment variable the config names.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key().with_context(|| {
            format!(
                "No API key configured. Set the {} environment variable.",
                config.completion.api_key_env
            )
        })?;
        Ok(Self::new(&api_key, &config.completion.base_url)?)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        debug!(model = %request.model, turns = request.messages.len(), "sending completion request");

        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(%status, %message, "completion service returned an error");
            return Err(CompletionError::Status { status, message });
        }

        let decoded: CompletionResponse = serde_json::from_str(&body)?;
        debug!(choices = decoded.choices.len(), "completion response decoded");
        Ok(decoded)
    }
}
