use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::types::{ContentBlock, ErrorEnvelope, Message, MessagesRequest, MessagesResponse};
use crate::config::ApiKey;

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("ANTHROPIC_API_KEY is not configured")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("API authentication failed: {0}")]
    Auth(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Unexpected response type from model API")]
    UnexpectedResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One single-turn prompt.
#[derive(Debug)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: String,
}

/// Text in, model reply text out. `ClaudeClient` in production, recording
/// fakes in tests.
#[async_trait]
pub trait EntityExtractionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct ClaudeClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(http: Client, api_key: ApiKey, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EntityExtractionProvider for ClaudeClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: request.model,
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let classified = classify_failure(status, &text);
            warn!(error = %classified, "model API error");
            return Err(classified);
        }

        let reply: MessagesResponse = response.json().await?;
        debug!(model = %request.model, blocks = reply.content.len(), "model reply received");

        match reply.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Ok(text),
            _ => Err(LlmError::UnexpectedResponse),
        }
    }
}

fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|err| match (err.kind, err.message) {
            (Some(kind), Some(msg)) => Some(format!("{kind}: {msg}")),
            (None, Some(msg)) => Some(msg),
            (Some(kind), None) => Some(kind),
            (None, None) => None,
        })
        .unwrap_or_else(|| {
            let end = body.floor_char_boundary(200);
            format!("HTTP {status}: {}", &body[..end])
        });

    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(message),
        _ => LlmError::Api {
            code: status.as_u16(),
            message,
        },
    }
}
