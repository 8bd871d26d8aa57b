//! OpenAI-compatible chat-completions client with automatic retry for
//! transient errors.
//!
//! All supported providers expose an OpenAI-compatible chat endpoint, so a
//! single client covers the whole provider enum; only the base URL and API
//! key differ.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Provider;

use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, ToolCall, ToolDefinition};

/// Why a provider call failed. Drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// 429 from the provider.
    RateLimited,
    /// 5xx from the provider.
    ServerError,
    /// 4xx other than 429. Retrying would fail the same way.
    ClientError,
    /// Connection or timeout failure before a response arrived.
    NetworkError,
    /// The response body did not match the expected shape.
    ParseError,
}

impl ChatErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ChatErrorKind::RateLimited | ChatErrorKind::ServerError | ChatErrorKind::NetworkError
        )
    }
}

/// Classify an HTTP status code for retry purposes.
pub fn classify_http_status(status: u16) -> ChatErrorKind {
    match status {
        429 => ChatErrorKind::RateLimited,
        500..=599 => ChatErrorKind::ServerError,
        _ => ChatErrorKind::ClientError,
    }
}

/// A failed chat-completion request, classified by cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_send_error(endpoint: &str, e: reqwest::Error) -> Self {
        // Only failures that never reached the server are worth retrying.
        let kind = if e.is_timeout() || e.is_connect() {
            ChatErrorKind::NetworkError
        } else {
            ChatErrorKind::ClientError
        };
        Self::new(kind, format!("request to {endpoint} failed: {e}"))
    }
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Chat-completions client for one provider endpoint.
pub struct HttpChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryConfig,
}

impl HttpChatClient {
    /// Create a client for a provider's OpenAI-compatible endpoint.
    pub fn for_provider(provider: Provider, api_key: String) -> Self {
        Self::new(provider.chat_completions_url().to_string(), api_key)
    }

    /// Create a client for an explicit endpoint URL.
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn execute_request(&self, request: &CompletionRequest) -> Result<ChatResponse, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::from_send_error(&self.endpoint, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ChatError::new(
                classify_http_status(status.as_u16()),
                format!("provider returned {}: {}", status, truncate(&body, 300)),
            ));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ChatError::new(
                ChatErrorKind::ParseError,
                format!("failed to parse response: {}, body: {}", e, truncate(&body, 300)),
            )
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ChatError::new(ChatErrorKind::ParseError, "no choices in response")
        })?;

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
            finish_reason: choice.finish_reason,
            model: parsed.model.or_else(|| Some(request.model.clone())),
            // Passed through verbatim so normalization stays a separate concern.
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl LlmClient for HttpChatClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(model, endpoint = %self.endpoint, "sending chat completion request");

        let mut attempt = 0;
        loop {
            match self.execute_request(&request).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if attempt >= self.retry.max_retries || !error.kind.is_transient() {
                        return Err(error.into());
                    }
                    let delay = self.retry.base_delay * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        kind = ?error.kind,
                        ?delay,
                        "transient provider error, retrying: {error}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// OpenAI-compatible request format.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

/// OpenAI-compatible response format.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    /// Kept as raw JSON; providers disagree on the field names inside.
    #[serde(default)]
    usage: Option<serde_json::Value>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}
