// Canned LLM client for tests and offline runs
//
// Returns a fixed reply (or a fixed error) and records every prompt it was sent,
// so tests can assert how many network calls a run would have made.

use super::claude_client::LlmClient;
use super::context_builder::PromptRequest;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum CannedReply {
    Text(String),
    RateLimited,
    ServiceError(String),
}

#[derive(Clone)]
pub struct CannedLlmClient {
    reply: CannedReply,
    calls: Arc<Mutex<Vec<PromptRequest>>>,
}

impl CannedLlmClient {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: CannedReply::Text(reply.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            reply: CannedReply::RateLimited,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: CannedReply::ServiceError(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    /// Prompts received so far
    pub fn calls(&self) -> Vec<PromptRequest> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for CannedLlmClient {
    async fn complete(
        &self,
        request: &PromptRequest,
        _model_id: &str,
        _max_output_tokens: u32,
    ) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        match &self.reply {
            CannedReply::Text(text) => Ok(text.clone()),
            CannedReply::RateLimited => Err(AgentError::RateLimited("canned 429".to_string())),
            CannedReply::ServiceError(message) => Err(AgentError::ServiceError(message.clone())),
        }
    }
}
