/// LLM Client: the single point of entry for chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the model provider directly.
/// Everything goes through `ChatModel`, implemented here by `LlmClient`.
///
/// Supports the Azure OpenAI deployment endpoint and the plain OpenAI endpoint.
/// Failed calls are NOT retried; the caller records the failure and moves on.
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const DEFAULT_API_VERSION: &str = "2023-05-15";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

/// Which flavour of the chat-completions API the endpoint speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `{base}/openai/deployments/{deployment}/chat/completions?api-version=…`, `api-key` header.
    #[default]
    Azure,
    /// `{base}/chat/completions`, bearer token, deployment sent as `model`.
    OpenAi,
}

impl FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" | "azure_ad" => Ok(ApiFlavor::Azure),
            "openai" | "open_ai" => Ok(ApiFlavor::OpenAi),
            other => Err(format!(
                "unknown API type '{other}' (expected 'azure' or 'openai')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters forwarded verbatim to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// Token usage reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice that has content.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .iter()
            .find_map(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// ChatModel seam
// ────────────────────────────────────────────────────────────────────────────

/// A finished completion: cleaned text plus the usage it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub text: String,
    pub usage: Usage,
}

/// The chat model trait. Carried in `AppState` as `Arc<dyn ChatModel>` so tests
/// can swap in a canned model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        deployment: &str,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<ChatCompletion, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_base: String,
    pub api_key: String,
    pub api_version: String,
    pub flavor: ApiFlavor,
    pub timeout: Duration,
}

/// HTTP client for the chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(settings.timeout).build()?,
            settings,
        })
    }

    fn endpoint(&self, deployment: &str) -> String {
        let base = self.settings.api_base.trim_end_matches('/');
        match self.settings.flavor {
            ApiFlavor::Azure => format!(
                "{base}/openai/deployments/{deployment}/chat/completions?api-version={}",
                self.settings.api_version
            ),
            ApiFlavor::OpenAi => format!("{base}/chat/completions"),
        }
    }

    /// Makes one raw call, returning the full response object.
    pub async fn call(
        &self,
        deployment: &str,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<ChatResponse, LlmError> {
        let body = CompletionBody {
            model: match self.settings.flavor {
                ApiFlavor::Azure => None,
                ApiFlavor::OpenAi => Some(deployment),
            },
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        let request = self.client.post(self.endpoint(deployment)).json(&body);
        let request = match self.settings.flavor {
            ApiFlavor::Azure => request.header("api-key", &self.settings.api_key),
            ApiFlavor::OpenAi => request.bearer_auth(&self.settings.api_key),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let chat_response: ChatResponse = serde_json::from_slice(&bytes)?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat_response)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(
        &self,
        deployment: &str,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<ChatCompletion, LlmError> {
        let response = self.call(deployment, messages, params).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;

        Ok(ChatCompletion {
            text: strip_code_fences(text).to_string(),
            usage: response.usage.unwrap_or_default(),
        })
    }
}

/// Strips ```html ... ``` (or any tagged / untagged) code fences from model output.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag, if any, up to the end of the opening line.
    let rest = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains(char::is_whitespace) => &rest[newline + 1..],
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| rest.trim())
}
