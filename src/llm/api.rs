//! Chat-completion endpoint abstraction and the Groq-hosted implementation.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

/// Environment variable holding the chat-completion API credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Chat-completion failures, classified for retry decisions.
#[derive(Debug)]
pub enum LlmError {
    /// Invalid or rejected credential; further calls will not succeed.
    Authentication(String),
    /// Rate limit hit; worth retrying after a growing delay.
    RateLimited(String),
    /// Anything else, transport failures included.
    Other(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            LlmError::RateLimited(msg) => write!(f, "Rate limit exceeded: {}", msg),
            LlmError::Other(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// A hosted chat-completion endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sends one user prompt and returns the generated text.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;
}

/// Groq-hosted OpenAI-compatible chat-completion API.
pub struct GroqApi {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqApi {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Overrides the endpoint base URL (primarily for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ChatApi for GroqApi {
    #[tracing::instrument(skip(self, prompt))]
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let request = wire::ChatRequest {
            model: &self.model,
            messages: vec![wire::Message {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Other(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let completion: wire::ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Other(format!("invalid response body: {}", e)))?;

        debug!("Chat completion succeeded with model {}", self.model);
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Other("response contained no choices".to_string()))
    }
}

/// Maps an unsuccessful response onto the retry taxonomy. The body is
/// consulted as well as the status because the endpoint reports some
/// conditions only through error codes in the payload.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<wire::ErrorResponse>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string());
    let lowered = body.to_lowercase();

    if status == StatusCode::UNAUTHORIZED
        || lowered.contains("invalid_api_key")
        || lowered.contains("invalid api key")
        || lowered.contains("authentication")
    {
        return LlmError::Authentication(detail);
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || lowered.contains("rate_limit_exceeded")
        || lowered.contains("rate limit")
    {
        return LlmError::RateLimited(detail);
    }
    LlmError::Other(format!("HTTP {}: {}", status.as_u16(), detail))
}

/// Wire types for the chat-completion endpoint (internal).
mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Debug)]
    pub struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: Vec<Message<'a>>,
        pub temperature: f32,
    }

    #[derive(Serialize, Debug)]
    pub struct Message<'a> {
        pub role: &'a str,
        pub content: &'a str,
    }

    #[derive(Deserialize, Debug)]
    pub struct ChatResponse {
        pub choices: Vec<Choice>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Choice {
        pub message: AssistantMessage,
    }

    #[derive(Deserialize, Debug)]
    pub struct AssistantMessage {
        pub content: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct ErrorResponse {
        pub error: ErrorDetail,
    }

    #[derive(Deserialize, Debug)]
    pub struct ErrorDetail {
        pub message: String,
    }
}
