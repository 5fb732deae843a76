use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Prompt in, text out. Agents and the manager only see this seam.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Clone)]
pub struct LLMClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
    timeout: Duration,
}

impl LLMClient {
    pub fn new(api_key: &str, base_url: Option<String>, model: String, timeout: Duration) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        let client = Client::with_config(config);
        Self { client, model, timeout }
    }

    /// Credentials are required up front; there is no ambient fallback.
    pub fn from_config(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(api_key, config.base_url.clone(), config.model.clone(), timeout))
    }

    fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let content = message.content.as_str();
        Ok(match message.role {
            ChatRole::System => ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default().content(content).build()?,
            ),
            ChatRole::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default().content(content).build()?,
            ),
            ChatRole::Assistant => ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default().content(content).build()?,
            ),
        })
    }
}

#[async_trait]
impl LanguageModel for LLMClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        info!("🤖 Sending request to LLM (Model: {}, {} messages)...", self.model, messages.len());

        let request_messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PipelineError::ModelService(format!(
                    "request timed out after {:?}",
                    self.timeout
                ))
            })??;

        info!("🤖 LLM Response received.");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::ModelService("response contained no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_api_key() {
        let config = LlmConfig::default();
        let err = LLMClient::from_config(&config, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_from_config_uses_model() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:1234/v1".to_string()),
            model: "gpt-4o-mini".to_string(),
        };
        let client = LLMClient::from_config(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_request_message_roles() {
        let msg = LLMClient::to_request_message(&ChatMessage::assistant("hi")).unwrap();
        assert!(matches!(msg, ChatCompletionRequestMessage::Assistant(_)));
        let msg = LLMClient::to_request_message(&ChatMessage::system("rules")).unwrap();
        assert!(matches!(msg, ChatCompletionRequestMessage::System(_)));
    }
}
