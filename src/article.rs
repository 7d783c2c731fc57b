//! Article download helpers that never fail a batch.
//!
//! Every failure mode is logged with its cause and converted to `None`, so a
//! single bad article cannot abort processing of the rest.

use log::{error, info};
use reqwest::StatusCode;

use crate::http::RetrySession;

/// Downloads an article page body.
///
/// HTTP 404, other non-success statuses, timeouts, connection failures, and
/// unexpected errors each log distinctly and yield `None`.
#[tracing::instrument(skip(session))]
pub async fn fetch_html(session: &RetrySession, url: &str) -> Option<String> {
    let response = match session.get(url).await {
        Ok(response) => response,
        Err(e) => {
            match e.downcast_ref::<reqwest::Error>() {
                Some(cause) if cause.is_timeout() => {
                    error!("Timeout while fetching article: {}", url);
                }
                Some(cause) => {
                    error!("Error fetching article at {}: {}", url, cause);
                }
                None => {
                    error!("Unexpected error fetching article at {}: {}", url, e);
                }
            }
            return None;
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        error!("Article not found (404): {}", url);
        return None;
    }
    if !status.is_success() {
        error!("Failed to retrieve article {}: status {}", url, status);
        return None;
    }

    match response.text().await {
        Ok(body) => Some(body),
        Err(e) => {
            error!("Error reading article body from {}: {}", url, e);
            None
        }
    }
}

/// Downloads an article and applies a caller-provided HTML-to-text extractor.
///
/// The extractor owns the parsing strategy; an empty or failed extraction is
/// reported as no content.
pub async fn fetch_article_text<F>(session: &RetrySession, url: &str, extract: F) -> Option<String>
where
    F: FnOnce(&str) -> Option<String>,
{
    let body = fetch_html(session, url).await?;
    match extract(&body) {
        Some(text) if !text.trim().is_empty() => Some(text),
        _ => {
            info!("No content extracted from {}", url);
            None
        }
    }
}
