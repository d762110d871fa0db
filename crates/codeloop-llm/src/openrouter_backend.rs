//! OpenRouter HTTP backend
//!
//! OpenRouter exposes many models behind one OpenAI-compatible chat
//! completions endpoint.

use async_trait::async_trait;
use codeloop_config::Config;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_TITLE: &str = "codeloop";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OpenRouterBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl OpenRouterBackend {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Build from `[llm.openrouter]`, reading the API key from the configured
    /// environment variable.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let openrouter = &config.llm.openrouter;
        let api_key = std::env::var(&openrouter.api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "OpenRouter API key not found in environment variable '{}'. \
                 Set it or configure a different api_key_env in [llm.openrouter].",
                openrouter.api_key_env
            ))
        })?;

        if openrouter.model.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "OpenRouter model not specified. Set [llm.openrouter] model = \"model-name\"."
                    .to_string(),
            ));
        }

        Self::new(
            api_key,
            openrouter.base_url.clone(),
            openrouter.model.clone(),
            HttpParams {
                max_tokens: openrouter.max_tokens,
                temperature: openrouter.temperature,
            },
        )
    }

    /// Invocation values override backend defaults: `inv.model` when
    /// non-empty, then `max_tokens` and `temperature` from metadata.
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(self.default_params.max_tokens);

        #[allow(clippy::cast_possible_truncation)]
        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage<'_>> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = "openrouter",
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking OpenRouter backend"
        );

        let body = OpenRouterRequest {
            model: &model,
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = reqwest::Client::new()
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", DEFAULT_TITLE)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "openrouter")
            .await?;

        let response: OpenRouterResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to parse OpenRouter response: {e}")))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::Transport("OpenRouter response missing content in choices[0]".to_string())
            })?;

        let mut result = LlmResult::new(content, "openrouter", model);
        if let Some(usage) = response.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = "openrouter",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "OpenRouter invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenRouterRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
