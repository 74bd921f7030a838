//! Completion backends that turn a prompt into ledger text.
//!
//! - [`CompletionBackend`]: the async interface the orchestrator drives
//! - [`OpenAiCompatibleBackend`]: any server implementing
//!   `POST {base_url}/chat/completions` (DeepSeek, vLLM, LocalAI, ...)
//! - [`MockBackend`]: canned responses for tests and offline runs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use viz_core::error::{Result, VizError};

/// Interface for every completion backend.
///
/// Backends are `Send + Sync` so the orchestrator can move them into a
/// spawned task.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `prompt` as a single user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// `true` when the backend answers a trivial request.
    async fn health_check(&self) -> bool;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ── OpenAI-compatible ─────────────────────────────────────────────────────────

/// Backend for OpenAI-style chat completion APIs.
///
/// `base_url` already carries the version segment, e.g.
/// `https://api.deepseek.com/v1`.
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        if !api_key.is_empty() {
            backend.api_key = Some(api_key.to_string());
        }
        backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        let mut req_builder = self.http_client.post(self.endpoint()).json(&request);
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| VizError::Api(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VizError::Api(format!("status {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VizError::Api(format!("invalid response body: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| VizError::Api("response contained no choices".to_string()))
    }
}

impl std::fmt::Debug for OpenAiCompatibleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|k| mask_key(k)))
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} prompt chars to {}", prompt.chars().count(), self.endpoint());
        let reply = self
            .chat_completion(vec![ChatMessage::user(prompt)])
            .await?;
        debug!("Received {} reply chars", reply.chars().count());
        Ok(reply)
    }

    async fn health_check(&self) -> bool {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: "You are a helpful assistant".to_string(),
            },
            ChatMessage::user("你好"),
        ];
        match self.chat_completion(messages).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Connection check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

/// Show only the last four characters of an API key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{}", "*".repeat(hidden), tail)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// ── Mock ──────────────────────────────────────────────────────────────────────

/// Backend returning a fixed reply.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    /// Reply returned by `complete`; `None` makes `complete` fail.
    pub response: Option<String>,
    /// Whether `health_check` should return true.
    pub healthy: bool,
}

impl MockBackend {
    /// Healthy backend answering every prompt with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            healthy: true,
        }
    }

    /// Backend whose calls all fail.
    pub fn failing() -> Self {
        Self {
            response: None,
            healthy: false,
        }
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.response
            .clone()
            .ok_or_else(|| VizError::Api("mock backend configured to fail".to_string()))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OpenAiCompatibleBackend::new("https://api.deepseek.com/v1/", "deepseek-chat");
        assert_eq!(backend.base_url(), "https://api.deepseek.com/v1");
        assert_eq!(backend.model(), "deepseek-chat");
        assert_eq!(
            backend.endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_backend_with_api_key() {
        let backend = OpenAiCompatibleBackend::with_api_key("http://localhost:8080/v1", "m", "sk-test123");
        assert_eq!(backend.api_key, Some("sk-test123".to_string()));

        let keyless = OpenAiCompatibleBackend::with_api_key("http://localhost:8080/v1", "m", "");
        assert!(keyless.api_key.is_none());
    }

    #[test]
    fn test_debug_masks_key() {
        let backend = OpenAiCompatibleBackend::with_api_key("http://x/v1", "m", "sk-secret-9876");
        let rendered = format!("{:?}", backend);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("9876"));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-abcdef1234"), "*********1234");
        assert_eq!(mask_key("abc"), "abc");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn test_chat_completion_request_serialization() {
        let request = ChatCompletionRequest {
            model: "deepseek-chat".to_string(),
            messages: vec![ChatMessage::user("你好")],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "你好");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_chat_completion_response_deserialization() {
        let body = r##"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"# start\n# end"}}]}"##;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "# start\n# end");
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAiCompatibleBackend::new("http://localhost:99999", "deepseek-chat");
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new("# start\n# end");
        assert_eq!(backend.complete("anything").await.unwrap(), "# start\n# end");
        assert!(backend.health_check().await);
        assert_eq!(backend.name(), "mock");

        let failing = MockBackend::failing();
        assert!(matches!(failing.complete("x").await, Err(VizError::Api(_))));
        assert!(!failing.health_check().await);
    }
}
