use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{AppError, Result};

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

/// A chat-completion backend that answers a single user prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

pub struct DeepSeekClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl DeepSeekClient {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

/// Pulls `choices[0].message.content` out of a chat-completion response.
pub fn extract_reply(json: &Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            error!("Chat completion response has no message content: {}", json);
            AppError::Parse("Invalid response format from LLM".to_string())
        })
}

#[async_trait]
impl ChatModel for DeepSeekClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("DEEPSEEK_API_KEY is not configured".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!("Calling DeepSeek with model {}", self.model);
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("DeepSeek request failed: {}", e);
                AppError::Upstream(format!("LLM request failed: {}", e.without_url()))
            })?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            error!("DeepSeek returned HTTP {}: {}", status, detail);
            return Err(AppError::Upstream(format!("LLM request failed with HTTP {}", status)));
        }

        let json: Value = res.json().await.map_err(|e| {
            error!("Unreadable DeepSeek response: {}", e);
            AppError::Parse("Invalid response format from LLM".to_string())
        })?;

        extract_reply(&json)
    }
}
