//! OpenAI-compatible LLM client.
//!
//! Works with any OpenAI-compatible API endpoint. The core never inspects
//! model internals; it supplies fully rendered prompts and reads text back.

use crate::config::LlmConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Text-generation service boundary. One method pair: uncapped (configured
/// max_tokens) and explicitly capped output length. The judge relies on the
/// capped form to force single-token outputs.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Complete with the configured output budget.
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String>;

    /// Complete with an explicit output-length cap overriding the configured
    /// budget.
    async fn complete_capped(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<String>;
}

/// Message role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/chat/completions", base)
    }

    /// Send a chat completion request.
    async fn chat(&self, messages: Vec<Message>, max_tokens: u32) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(max_tokens),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse as API error
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(RagError::Generation(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(RagError::Generation(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Generation("No choices in response".to_string()))?;

        Ok(choice.message.content)
    }

    fn build_messages(system: Option<&str>, user: &str) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));
        messages
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let response = self
            .chat(
                vec![Message::user("Say 'hello' and nothing else.")],
                self.config.max_tokens,
            )
            .await?;

        if response.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(RagError::Generation(format!(
                "Unexpected response: {}",
                response
            )))
        }
    }
}

#[async_trait]
impl GenerationService for LlmClient {
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        self.chat(Self::build_messages(system, user), self.config.max_tokens)
            .await
    }

    async fn complete_capped(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<String> {
        self.chat(Self::build_messages(system, user), max_tokens)
            .await
    }
}
