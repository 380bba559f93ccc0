use std::fs;

use thiserror::Error;

use crate::attachments::{BlobStoreConfig, DEFAULT_BLOB_API_URL};
use crate::config_env::{
    optional_trimmed_env, parse_f32_env, parse_u64_env, parse_usize_env, require_http_url,
    require_non_empty_env,
};
use crate::lead::{DispatchMode, LeadProfile, LeadSchema, WebhookConfig};
use crate::llm::ChatCompletionsConfig;
use crate::llm::chat_completions::{
    DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_MS,
};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub llm: ChatCompletionsConfig,
    pub profile: LeadProfile,
    pub schema: LeadSchema,
    pub preamble: String,
    pub webhook: WebhookConfig,
    pub blob: BlobStoreConfig,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid number in env var {0}")]
    ParseFloat(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Loads `.env` from the working directory into the process environment.
/// A missing file is not an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::InvalidConfiguration(format!(
            ".env could not be loaded: {err}"
        ))),
    }
}

impl AppConfig {
    /// Reads configuration from the process environment only; call
    /// [`load_dotenv`] first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = match optional_trimmed_env("LEAD_PROFILE") {
            Some(raw) => raw
                .parse::<LeadProfile>()
                .map_err(ConfigError::InvalidConfiguration)?,
            None => LeadProfile::LeadCapture,
        };
        let dispatch_mode = match optional_trimmed_env("LEAD_DISPATCH_MODE") {
            Some(raw) => raw
                .parse::<DispatchMode>()
                .map_err(ConfigError::InvalidConfiguration)?,
            None => profile.default_dispatch_mode(),
        };
        let preamble = match optional_trimmed_env("LEAD_SYSTEM_PROMPT_PATH") {
            Some(path) => fs::read_to_string(&path).map_err(|err| {
                ConfigError::InvalidConfiguration(format!(
                    "LEAD_SYSTEM_PROMPT_PATH '{path}' could not be read: {err}"
                ))
            })?,
            None => profile.default_preamble(),
        };
        let webhook_url = optional_trimmed_env("LEAD_WEBHOOK_URL")
            .map(|url| require_http_url("LEAD_WEBHOOK_URL", url))
            .transpose()?;

        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            llm: llm_config_from_env()?,
            profile,
            schema: profile.schema(),
            preamble,
            webhook: WebhookConfig {
                url: webhook_url,
                mode: dispatch_mode,
                timeout_ms: parse_u64_env("WEBHOOK_TIMEOUT_MS", DEFAULT_WEBHOOK_TIMEOUT_MS)?,
            },
            blob: BlobStoreConfig {
                api_url: require_http_url(
                    "BLOB_API_URL",
                    optional_trimmed_env("BLOB_API_URL")
                        .unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string()),
                )?,
                token: optional_trimmed_env("BLOB_READ_WRITE_TOKEN"),
            },
            max_upload_bytes: parse_usize_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn llm_config_from_env() -> Result<ChatCompletionsConfig, ConfigError> {
    let api_key = require_non_empty_env("LLM_API_KEY")
        .or_else(|_| require_non_empty_env("GROQ_API_KEY"))
        .map_err(|_| ConfigError::MissingVar("LLM_API_KEY".to_string()))?;
    let chat_completions_url = require_http_url(
        "LLM_CHAT_COMPLETIONS_URL",
        optional_trimmed_env("LLM_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string()),
    )?;

    Ok(ChatCompletionsConfig {
        chat_completions_url,
        api_key,
        model: optional_trimmed_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        temperature: parse_f32_env("LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        timeout_ms: parse_u64_env("LLM_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
    })
}
