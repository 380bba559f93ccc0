use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ChatMessage;

pub type LlmGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletion, LlmGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    /// Places the system preamble ahead of the caller's history, which is
    /// forwarded untouched.
    pub fn with_preamble(preamble: &str, history: &[ChatMessage]) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(preamble));
        messages.extend_from_slice(history);
        Self { messages }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmTokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub model: String,
    pub provider_request_id: Option<String>,
    pub content: String,
    pub usage: Option<LlmTokenUsage>,
}

#[derive(Debug, Error)]
pub enum LlmGatewayError {
    #[error("llm provider request timed out")]
    Timeout,
    #[error("llm provider request failed: {0}")]
    ProviderFailure(String),
    #[error("llm provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

pub trait LlmGateway: Send + Sync {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> LlmGatewayFuture<'a>;
}
