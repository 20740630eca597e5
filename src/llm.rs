//! Language model client
//!
//! The chain only needs "system + user prompt in, text out". The HTTP client
//! speaks the OpenAI-compatible chat-completions protocol and keeps one
//! long-lived reqwest::Client for connection pooling.

use crate::config::LlmConfig;
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// A text-generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Chat-completions client (OpenAI, vLLM, Ollama, LiteLLM proxies, ...)
pub struct ChatCompletionClient {
    client: Client,
    config: LlmConfig,
    endpoint: String,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.request_model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model_name, "Calling chat completions");

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Chat completion request failed: {}", e);
            AgentError::LlmError(format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completion error response: {} {}", status, error_text);
            return Err(AgentError::LlmError(format!("{}: {}", status, error_text)));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion: {}", e);
            AgentError::LlmError(format!("parse error: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::LlmError("no choices in response".to_string()))?;

        let text = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AgentError::LlmError("empty completion".to_string()))?;

        info!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            chars = text.len(),
            "Chat completion received"
        );

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
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
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Model that replays canned replies in order.
/// Keeps chains runnable without a live endpoint (tests, dry runs).
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// `(system, prompt)` pairs in call order
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .await
            .push((system.to_string(), prompt.to_string()));

        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::LlmError("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "What is my life path?",
            }],
            temperature: None,
            max_tokens: Some(512),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is my life path?"));
        assert!(json.contains("\"max_tokens\":512"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::from_replies(["one", "two"]);

        assert_eq!(model.complete("s", "a").await.unwrap(), "one");
        assert_eq!(model.complete("s", "b").await.unwrap(), "two");
        assert!(matches!(
            model.complete("s", "c").await,
            Err(AgentError::LlmError(_))
        ));
        assert_eq!(model.call_count().await, 3);
        assert_eq!(model.calls().await[1].1, "b");
    }
}
