//! Chat completions client for Groq (or any OpenAI compatible endpoint)

use super::{LlmError, LlmGateway};
use crate::config::Settings;
use llm_pipelines_sdk::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    default_temperature: f32,
    max_tokens: u32,
}

impl GroqClient {
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let api_key = settings.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout)
            .build()?;

        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            default_temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Same client, different model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmGateway for GroqClient {
    async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: temperature.unwrap_or(self.default_temperature),
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "chat completion rejected");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(response_chars = text.len(), "chat completion received");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
