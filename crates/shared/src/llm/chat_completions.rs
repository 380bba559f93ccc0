use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::gateway::{
    ChatCompletion, ChatCompletionRequest, LlmGateway, LlmGatewayError, LlmGatewayFuture,
    LlmTokenUsage,
};
use crate::models::ChatMessage;

pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ChatCompletionsConfigError {
    #[error("failed to build chat completions http client: {0}")]
    HttpClient(String),
}

/// Single-attempt client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionsGateway {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsGateway {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, ChatCompletionsConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ChatCompletionsConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_once(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletion, LlmGatewayError> {
        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&CompletionBody {
                model: &self.config.model,
                messages: &request.messages,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let raw = response
            .text()
            .await
            .map_err(|_| invalid_payload("response_body_read_failed"))?;

        if !status.is_success() {
            return Err(LlmGatewayError::ProviderFailure(format!(
                "status={} code={}",
                status.as_u16(),
                provider_error_code(&raw)
            )));
        }

        let reply = serde_json::from_str::<CompletionReply>(&raw)
            .map_err(|_| invalid_payload("response_json_parse_failed"))?;
        let completion = reply.into_completion(&self.config.model, request_id)?;
        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion token usage"
            );
        }

        Ok(completion)
    }
}

impl LlmGateway for ChatCompletionsGateway {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(self.send_once(request))
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

impl CompletionReply {
    /// Only the first choice is read; its content must be a non-blank string.
    fn into_completion(
        self,
        configured_model: &str,
        header_request_id: Option<String>,
    ) -> Result<ChatCompletion, LlmGatewayError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| invalid_payload("missing_choice"))?;
        let content = match choice.message.content {
            Value::String(text) if !text.trim().is_empty() => text,
            Value::String(_) | Value::Null => return Err(invalid_payload("empty_content")),
            _ => return Err(invalid_payload("unsupported_content_shape")),
        };

        Ok(ChatCompletion {
            model: self.model.unwrap_or_else(|| configured_model.to_owned()),
            provider_request_id: header_request_id.or(self.id),
            content,
            usage: self.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: saturating_u32(usage.prompt_tokens),
                completion_tokens: saturating_u32(usage.completion_tokens),
                total_tokens: saturating_u32(usage.total_tokens),
            }),
        })
    }
}

fn transport_error(err: reqwest::Error) -> LlmGatewayError {
    if err.is_timeout() {
        LlmGatewayError::Timeout
    } else {
        LlmGatewayError::ProviderFailure("request_unavailable".to_string())
    }
}

fn invalid_payload(code: &str) -> LlmGatewayError {
    LlmGatewayError::InvalidProviderPayload(code.to_string())
}

/// Reads `error.code` from an OpenAI-style error body; numeric codes are
/// rendered as text.
fn provider_error_code(raw: &str) -> String {
    let code = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|body| body.get("error")?.get("code").cloned());
    match code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => "unknown".to_string(),
    }
}

fn saturating_u32(value: Option<u64>) -> u32 {
    u32::try_from(value.unwrap_or(0)).unwrap_or(u32::MAX)
}
