use crate::{
    config::{EngineConfig, Provider},
    error::BackendError,
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use tracing::debug;

/// The text-generation capability the engine is built on.
///
/// One call, one outcome: implementations must not retry or stream partial
/// output. Anything that goes wrong is reported as a [`BackendError`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends `prompt` as a single user message and returns the raw reply text.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    /// Builds a client for the provider selected in `config`.
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.provider.api_base());
        Self::new(openai_config, config.chat_model.clone())
    }
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible endpoint.
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| BackendError::new(e.to_string()))?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(temperature)
            .build()
            .map_err(|e| BackendError::new(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::new("no response choice from LLM"))?
            .message
            .content
            .ok_or_else(|| BackendError::new("no content in LLM response"))?;

        debug!(model = %self.model, raw = %content, "Received raw LLM response");
        Ok(content)
    }
}
