//! HTTP session with bounded retries and a fixed set of retryable statuses.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};

use crate::retry::Backoff;

/// Retry behavior of a [`RetrySession`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub retries: u32,
    /// Base delay in seconds; the nth retry waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
    /// Status codes worth repeating the request for.
    pub status_forcelist: Vec<u16>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_factor: 0.3,
            status_forcelist: vec![500, 502, 503],
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }
}

/// HTTP session that retries transient failures before surfacing the result.
///
/// Responses with non-retryable statuses (404 included) are handed back
/// unchanged rather than turned into errors; only connection-level failures
/// that outlive every retry fail the call.
#[derive(Clone)]
pub struct RetrySession {
    client: Client,
    policy: RetryPolicy,
}

impl RetrySession {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs a GET request, retrying forcelisted statuses and transient
    /// connection failures with exponential backoff.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, url: &str) -> Result<Response> {
        let backoff = Backoff::new(Duration::from_secs_f64(self.policy.backoff_factor), 2.0);
        let mut attempt: u32 = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !self.policy.is_retryable_status(status) || attempt >= self.policy.retries {
                        debug!("GET {} -> {}", url, status);
                        return Ok(response);
                    }
                    attempt += 1;
                    let delay = backoff.delay(attempt - 1);
                    warn!(
                        "GET {} returned {}, retry {}/{} in {:?}",
                        url, status, attempt, self.policy.retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if is_transient(&e) && attempt < self.policy.retries => {
                    attempt += 1;
                    let delay = backoff.delay(attempt - 1);
                    warn!(
                        "GET {} failed ({}), retry {}/{} in {:?}",
                        url, e, attempt, self.policy.retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("GET {} failed", url));
                }
            }
        }
    }
}

/// Connection-level failures worth repeating; anything else fails the call.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}
