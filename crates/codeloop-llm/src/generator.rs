use async_trait::async_trait;
use codeloop_config::Config;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::LlmError;
use crate::format::{parse_outputs, render_messages};
use crate::openrouter_backend::OpenRouterBackend;
use crate::request::GenerationRequest;
use crate::types::{LlmBackend, LlmInvocation};

/// Output name → generated content, in signature order.
pub type GeneratedOutputs = IndexMap<String, String>;

/// Produces one string per declared output of a request.
#[async_trait]
pub trait Generator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`LlmError`] when the underlying model call fails or the
    /// response lacks a declared output.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for &G {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError> {
        (**self).generate(request).await
    }
}

/// Generator backed by a chat-completion [`LlmBackend`].
#[derive(Debug, Clone)]
pub struct ChatGenerator<B> {
    backend: B,
    model: String,
    timeout: Duration,
    temperature: Option<f64>,
}

impl<B: LlmBackend> ChatGenerator<B> {
    /// An empty `model` uses the backend default.
    #[must_use]
    pub fn new(backend: B, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn invocation(&self, request: &GenerationRequest) -> LlmInvocation {
        let inv = LlmInvocation::new(self.model.clone(), self.timeout, render_messages(request));
        match self.temperature {
            Some(t) => inv.with_metadata("temperature", serde_json::json!(t)),
            None => inv,
        }
    }
}

#[async_trait]
impl<B: LlmBackend> Generator for ChatGenerator<B> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError> {
        let inv = self.invocation(request);
        debug!(
            messages = inv.messages.len(),
            outputs = request.signature.outputs.len(),
            "Requesting generation"
        );

        let result = self.backend.invoke(inv).await?;
        info!(
            provider = %result.provider,
            model = %result.model_used,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Generation completed"
        );

        parse_outputs(&request.signature, &result.raw_response)
    }
}

/// Construct the configured backend.
///
/// # Errors
///
/// - [`LlmError::Unsupported`] for unknown providers
/// - [`LlmError::Misconfiguration`] for missing credentials or model
pub fn backend_from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config.llm.provider.as_str() {
        "openrouter" => Ok(Box::new(OpenRouterBackend::new_from_config(config)?)),
        other => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{other}'. Supported providers: openrouter"
        ))),
    }
}

/// Chat generator over the configured backend.
///
/// # Errors
///
/// See [`backend_from_config`].
pub fn from_config(config: &Config) -> Result<ChatGenerator<Box<dyn LlmBackend>>, LlmError> {
    let backend = backend_from_config(config)?;
    let openrouter = &config.llm.openrouter;
    Ok(ChatGenerator::new(
        backend,
        openrouter.model.clone(),
        Duration::from_secs(openrouter.timeout),
    )
    .with_temperature(f64::from(openrouter.temperature)))
}
