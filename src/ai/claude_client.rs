// Claude API client
//
// Implements the single request/response exchange with Anthropic's Messages API
// used by a generation run. HTTP failures are mapped onto the LLM error kinds:
// - 429 -> RateLimited
// - 413, or 400 complaining about prompt length -> RequestTooLarge
// - anything else -> ServiceError

use super::context_builder::PromptRequest;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MESSAGES_PATH: &str = "/v1/messages";
const CLAUDE_VERSION: &str = "2023-06-01";

/// Completion interface the agent talks to
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the model's reply text
    async fn complete(
        &self,
        request: &PromptRequest,
        model_id: &str,
        max_output_tokens: u32,
    ) -> Result<String>;
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

/// Request to Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::ServiceError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn classify_failure(status: StatusCode, retry_after: Option<String>, body: &str) -> AgentError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let hint = retry_after
                    .map(|s| format!(" (retry after {}s)", s))
                    .unwrap_or_default();
                AgentError::RateLimited(format!("API error {}{}: {}", status, hint, body))
            }
            StatusCode::PAYLOAD_TOO_LARGE => {
                AgentError::RequestTooLarge(format!("API error {}: {}", status, body))
            }
            StatusCode::BAD_REQUEST if body.to_lowercase().contains("too long") => {
                AgentError::RequestTooLarge(format!("API error {}: {}", status, body))
            }
            _ => AgentError::ServiceError(format!("API error {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn complete(
        &self,
        request: &PromptRequest,
        model_id: &str,
        max_output_tokens: u32,
    ) -> Result<String> {
        let body = ClaudeRequest {
            model: model_id,
            max_tokens: max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
            system: Some(&request.system),
        };

        debug!(
            "Sending {} catalog lines to {} ({} bytes)",
            request.catalog_lines,
            model_id,
            request.user.len()
        );

        let response = self
            .client
            .post(format!("{}{}", self.base_url, MESSAGES_PATH))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::ServiceError(format!("API request timed out: {}", e))
                } else {
                    AgentError::ServiceError(format!("API request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::classify_failure(status, retry_after, &error_text));
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ServiceError(format!("Failed to parse response: {}", e)))?;

        if claude_response.stop_reason.as_deref() == Some("max_tokens") {
            warn!("Reply hit the output token limit ({}), it may be cut short", max_output_tokens);
        }

        // Extract text from content blocks
        let text = claude_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }
}
