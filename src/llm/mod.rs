//! LLM request wrapper: bounded retries, rate-limit backoff, and a permanent
//! templated fallback once the credential is known to be bad.

mod api;
mod client;
mod fallback;

pub use api::{API_KEY_ENV, ChatApi, DEFAULT_MODEL, GroqApi, LlmError};
pub use client::{LlmClient, LlmConfig};
pub use fallback::fallback_response;
