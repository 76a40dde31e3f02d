//! Normalizer backed by an OpenAI-compatible chat completion API

use crate::config::{Config, NormalizerConfig};
use crate::model::RawRecord;
use crate::normalizer::prompt::{build_prompt, strip_code_fence, SYSTEM_PROMPT};
use crate::normalizer::{NormalizeError, NormalizeResult, Normalizer};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sends each raw record to a chat model and parses its JSON answer
#[derive(Clone)]
pub struct ChatCompletionNormalizer {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl ChatCompletionNormalizer {
    /// Creates a normalizer with an explicit API key
    pub fn new(http_client: Client, api_key: impl Into<String>, config: &NormalizerConfig) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Creates a normalizer from configuration, reading the API key from the
    /// environment variable named by `normalizer.api-key-env`
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let api_key = std::env::var(&config.normalizer.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                NormalizeError::MissingCredentials(config.normalizer.api_key_env.clone())
            })?;

        let http_client = Client::builder()
            .user_agent(config.user_agent.header_value())
            .timeout(config.harvest.normalize_timeout())
            .build()?;

        Ok(Self::new(http_client, api_key, &config.normalizer))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the chat request and returns the first choice's content
    async fn complete(&self, prompt: &str) -> NormalizeResult<String> {
        let start = Instant::now();

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Normalizer request failed: {}", e);
                NormalizeError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Normalizer API error {}: {}", status, error_text);
            return Err(NormalizeError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| NormalizeError::Malformed(format!("unreadable response body: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| NormalizeError::Malformed("response has no content".to_string()))?;

        tracing::debug!(
            "Chat completion with {} finished in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        Ok(content)
    }
}

#[async_trait]
impl Normalizer for ChatCompletionNormalizer {
    async fn normalize(&self, record: &RawRecord) -> NormalizeResult<Value> {
        let content = self.complete(&build_prompt(record)).await?;

        let value: Value = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| NormalizeError::Malformed(format!("invalid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(NormalizeError::Malformed(
                "expected a JSON object".to_string(),
            ));
        }

        Ok(value)
    }
}
