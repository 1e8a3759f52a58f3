//! Semantic advisor port and its chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AdvisorConfig;
use crate::context::{ContextPayload, SYSTEM_PROMPT};
use crate::error::{AdvisorError, Result};

/// An external model that describes the risks of a change in free text
#[async_trait]
pub trait SemanticAdvisor: Send + Sync {
    /// Return the model's raw reply for `payload`
    async fn advise(&self, payload: &ContextPayload) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Advisor backed by an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct HttpSemanticAdvisor {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl HttpSemanticAdvisor {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature,
        }
    }

    /// Build from configuration, reading the key from `api_key_env`
    pub fn from_config(config: &AdvisorConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            config.temperature,
        )
    }
}

#[async_trait]
impl SemanticAdvisor for HttpSemanticAdvisor {
    async fn advise(&self, payload: &ContextPayload) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let prompt = payload.to_prompt();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
        };

        debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "Calling semantic advisor");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::api_error(status.as_u16(), message));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdvisorError::InvalidResponse("response has no message content".to_string()))
    }
}
