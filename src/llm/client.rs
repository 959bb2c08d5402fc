//! OpenAI-compatible LLM client.
//!
//! This client works with any OpenAI-compatible chat completions endpoint,
//! including local servers and proxies.

use super::LanguageModel;
use crate::BoxFuture;
use crate::config::LlmConfig;
use crate::error::{Result, VectorboardError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
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
struct ChatCompletionRequest<'a> {
    model: &'a str,
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
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    // Some servers send null content for empty completions.
    #[serde(default)]
    content: Option<String>,
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

/// Token accounting reported by the server.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
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

    /// Model name sent with each request.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/chat/completions", base)
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(VectorboardError::LlmApi(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(VectorboardError::LlmApi(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let response = parse_completion(&body)?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion"
            );
        }
        if response.finish_reason.as_deref() == Some("length") {
            tracing::warn!(
                max_tokens = self.config.max_tokens,
                "completion truncated at max_tokens"
            );
        }

        Ok(response)
    }

    /// Convenience method: single user message with optional system prompt.
    pub async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::new();

        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));

        let response = self.chat(messages).await?;
        Ok(response.content)
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let content = self
            .complete(None, "Say 'hello' and nothing else.")
            .await?;

        if content.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(VectorboardError::LlmApi(format!(
                "Unexpected response: {}",
                content
            )))
        }
    }
}

fn parse_completion(body: &str) -> Result<LlmResponse> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| VectorboardError::LlmApi("No choices in response".to_string()))?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: completion.usage,
    })
}

impl LanguageModel for LlmClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let content = LlmClient::complete(self, None, prompt).await?;
            Ok(content.trim().to_string())
        })
    }
}
