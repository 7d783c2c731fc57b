//! Retrying wrapper around a chat-completion API with a templated fallback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{error, info, warn};

use crate::retry::Backoff;

use super::api::{API_KEY_ENV, ChatApi, GroqApi, LlmError};
use super::fallback::fallback_response;

/// Retry settings for [`LlmClient::generate`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Attempts made before giving up and answering from the template.
    pub max_retries: u32,
    /// Flat delay between unclassified failures; rate limits wait
    /// `retry_delay * 2^attempt` instead.
    pub retry_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Chat-completion wrapper that prefers a degraded answer over no answer.
///
/// Once an authentication failure is seen, the wrapper stops calling the
/// remote API for the rest of its lifetime and serves templated responses.
/// The switch is one-way.
pub struct LlmClient {
    api: Option<Box<dyn ChatApi>>,
    config: LlmConfig,
    use_fallback: AtomicBool,
}

impl LlmClient {
    /// Wraps the given API implementation.
    pub fn new(api: Box<dyn ChatApi>, config: LlmConfig) -> Self {
        Self {
            api: Some(api),
            config,
            use_fallback: AtomicBool::new(false),
        }
    }

    /// Builds a Groq-backed client from the `GROQ_API_KEY` environment
    /// variable. Without a credential the client starts in fallback mode.
    pub fn from_env() -> Self {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => {
                info!("Chat-completion client initialized");
                Self::new(Box::new(GroqApi::new(key)), LlmConfig::default())
            }
            _ => {
                warn!("{} is not set, serving templated responses only", API_KEY_ENV);
                Self::without_api()
            }
        }
    }

    /// A client that always answers from the template.
    pub fn without_api() -> Self {
        Self {
            api: None,
            config: LlmConfig::default(),
            use_fallback: AtomicBool::new(true),
        }
    }

    /// Whether the client has degraded to templated responses.
    pub fn uses_fallback(&self) -> bool {
        self.use_fallback.load(Ordering::Relaxed)
    }

    /// Generates text for the prompt, never failing: the first successful
    /// remote completion if possible, the templated fallback otherwise.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn generate(&self, prompt: &str, temperature: f32) -> String {
        if self.uses_fallback() {
            return fallback_response(prompt);
        }
        let Some(api) = self.api.as_deref() else {
            return fallback_response(prompt);
        };

        let max_retries = self.config.max_retries.max(1);
        let backoff = Backoff::new(self.config.retry_delay, 2.0);

        for attempt in 0..max_retries {
            match api.complete(prompt, temperature).await {
                Ok(text) => return text,
                Err(LlmError::Authentication(detail)) => {
                    warn!(
                        "Invalid API credentials detected, switching to templated responses: {}",
                        detail
                    );
                    self.use_fallback.store(true, Ordering::Relaxed);
                    return fallback_response(prompt);
                }
                Err(err) => {
                    error!(
                        "LLM request failed (attempt {}/{}): {}",
                        attempt + 1,
                        max_retries,
                        err
                    );
                    if attempt + 1 == max_retries {
                        break;
                    }
                    let delay = match &err {
                        LlmError::RateLimited(_) => backoff.delay(attempt),
                        _ => self.config.retry_delay,
                    };
                    info!("Waiting {:?} before retry", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!("Failed to generate text after {} attempts", max_retries);
        fallback_response(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Plays back a fixed sequence of API outcomes, counting calls.
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatApi for Arc<ScriptedApi> {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Other("script exhausted".to_string())))
        }
    }

    fn client_with(api: &Arc<ScriptedApi>, config: LlmConfig) -> LlmClient {
        LlmClient::new(Box::new(Arc::clone(api)), config)
    }

    fn fast_config() -> LlmConfig {
        LlmConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_first_successful_attempt_wins() {
        let api = ScriptedApi::new(vec![Ok("Shares rose on earnings.".to_string())]);
        let client = client_with(&api, fast_config());

        let text = client.generate("Explain the move", 0.3).await;

        assert_eq!(text, "Shares rose on earnings.");
        assert_eq!(api.calls(), 1);
        assert!(!client.uses_fallback());
    }

    #[tokio::test]
    async fn test_authentication_error_switches_to_fallback_permanently() {
        let api = ScriptedApi::new(vec![Err(LlmError::Authentication(
            "Invalid API Key".to_string(),
        ))]);
        let client = client_with(&api, fast_config());

        let prompt = "Some unrelated prompt";
        let first = client.generate(prompt, 0.3).await;
        let second = client.generate(prompt, 0.3).await;

        // One remote call total: the second generate never reaches the API.
        assert_eq!(api.calls(), 1);
        assert!(client.uses_fallback());
        assert_eq!(first, fallback_response(prompt));
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_exponentially_then_succeeds() {
        let api = ScriptedApi::new(vec![
            Err(LlmError::RateLimited("slow down".to_string())),
            Err(LlmError::RateLimited("slow down".to_string())),
            Ok("Recovered answer.".to_string()),
        ]);
        let config = LlmConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(40),
        };
        let client = client_with(&api, config);

        let start = Instant::now();
        let text = client.generate("Explain the move", 0.3).await;
        let elapsed = start.elapsed();

        assert_eq!(text, "Recovered answer.");
        assert_eq!(api.calls(), 3);
        // Waited 40ms * 2^0 + 40ms * 2^1 = 120ms across the two rate limits.
        assert!(elapsed >= Duration::from_millis(120), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_falls_back() {
        let api = ScriptedApi::new(vec![
            Err(LlmError::RateLimited("slow down".to_string())),
            Err(LlmError::RateLimited("slow down".to_string())),
            Err(LlmError::RateLimited("slow down".to_string())),
        ]);
        let client = client_with(&api, fast_config());

        let prompt = "Some unrelated prompt";
        let text = client.generate(prompt, 0.3).await;

        assert_eq!(api.calls(), 3);
        assert_eq!(text, fallback_response(prompt));
        // Exhaustion is not an authentication failure: the next call still
        // tries the remote API.
        assert!(!client.uses_fallback());
    }

    #[tokio::test]
    async fn test_unclassified_errors_retry_flat_then_fall_back() {
        let api = ScriptedApi::new(vec![
            Err(LlmError::Other("boom".to_string())),
            Err(LlmError::Other("boom".to_string())),
            Err(LlmError::Other("boom".to_string())),
        ]);
        let client = client_with(&api, fast_config());

        let prompt = "Some unrelated prompt";
        let start = Instant::now();
        let text = client.generate(prompt, 0.3).await;
        let elapsed = start.elapsed();

        assert_eq!(api.calls(), 3);
        assert_eq!(text, fallback_response(prompt));
        // Two flat 10ms delays between the three attempts.
        assert!(elapsed >= Duration::from_millis(20), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_without_api_always_uses_fallback() {
        let client = LlmClient::without_api();
        let prompt = "Some unrelated prompt";

        assert!(client.uses_fallback());
        assert_eq!(client.generate(prompt, 0.3).await, fallback_response(prompt));
    }
}
