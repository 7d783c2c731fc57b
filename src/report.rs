//! Assembles why-it-moves reports for classified daily movers.

use log::info;
use serde::{Deserialize, Serialize};

use crate::article;
use crate::http::RetrySession;
use crate::llm::LlmClient;
use crate::summarize;

/// Daily classification of a mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Gainer,
    Loser,
}

impl MoveKind {
    /// Classifies a mover from its daily change percentage.
    pub fn classify(daily_change_percentage: f64) -> Self {
        if daily_change_percentage > 0.0 {
            MoveKind::Gainer
        } else {
            MoveKind::Loser
        }
    }

    /// Price direction implied by the classification.
    pub fn direction(self) -> Direction {
        match self {
            MoveKind::Gainer => Direction::Up,
            MoveKind::Loser => Direction::Down,
        }
    }
}

/// Direction a stock is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// News article in the shape the upstream fetchers produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_article_text: Option<String>,
}

/// Explanation of one mover, in the shape the dashboard consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    pub symbol: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub kind: MoveKind,
    pub period: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_change_percentage: Option<f64>,
}

/// Summary used when no news explains the move.
pub const NO_NEWS_SUMMARY: &str = "There are no news currently affecting the stock price, fluctuations might be due to market conditions.";

impl MoveReport {
    fn no_news(symbol: &str, exchange: &str, kind: MoveKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            kind,
            period: "day".to_string(),
            summary: NO_NEWS_SUMMARY.to_string(),
            daily_change_percentage: None,
        }
    }
}

/// Explains why a classified mover is moving, from its recent news.
///
/// Articles missing their text are downloaded through the retrying session
/// and handed to the caller's HTML-to-text extractor; articles that still
/// have no text are skipped rather than failing the batch.
#[tracing::instrument(skip(session, llm, articles, extract))]
pub async fn explain_move<F>(
    session: &RetrySession,
    llm: &LlmClient,
    symbol: &str,
    exchange: &str,
    kind: MoveKind,
    mut articles: Vec<NewsArticle>,
    extract: F,
) -> MoveReport
where
    F: Fn(&str) -> Option<String>,
{
    info!(
        "Processing {} news articles for {} ({:?})",
        articles.len(),
        symbol,
        kind
    );

    if articles.is_empty() {
        info!("No news articles found for {}", symbol);
        return MoveReport::no_news(symbol, exchange, kind);
    }

    for item in &mut articles {
        if item.full_article_text.is_some() || item.url.is_empty() {
            continue;
        }
        item.full_article_text = article::fetch_article_text(session, &item.url, &extract).await;
    }

    let direction = kind.direction();
    let mut summaries = Vec::new();
    for item in &articles {
        let Some(text) = item.full_article_text.as_deref() else {
            continue;
        };
        if let Some(summary) = summarize::summarize_article(llm, text, symbol, direction).await {
            summaries.push(summary);
        }
    }

    if summaries.is_empty() {
        info!("No article text available for {}, skipping summary", symbol);
        return MoveReport::no_news(symbol, exchange, kind);
    }

    let summary = summarize::summarize_articles(llm, &summaries, symbol).await;
    MoveReport {
        symbol: symbol.to_string(),
        exchange: exchange.to_string(),
        kind,
        period: "day".to_string(),
        summary,
        daily_change_percentage: None,
    }
}

/// Explains a daily move from its change percentage and the news on record.
///
/// Classifies the mover from the percentage and explains it from the
/// articles. Callers with no news data for the symbol pass `None` and get a
/// report whose canned summary names the change instead.
#[tracing::instrument(skip(session, llm, news, extract))]
pub async fn why_it_moves<F>(
    session: &RetrySession,
    llm: &LlmClient,
    symbol: &str,
    exchange: &str,
    daily_change_percentage: f64,
    news: Option<Vec<NewsArticle>>,
    extract: F,
) -> MoveReport
where
    F: Fn(&str) -> Option<String>,
{
    let kind = MoveKind::classify(daily_change_percentage);
    info!(
        "Generating mover summary for {}/{} ({:.2}%)",
        exchange, symbol, daily_change_percentage
    );

    let mut report = match news {
        Some(articles) => {
            explain_move(session, llm, symbol, exchange, kind, articles, extract).await
        }
        None => MoveReport {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            kind,
            period: "day".to_string(),
            summary: format!(
                "No news data available for {}. The stock's movement of {:.2}% may be related to market conditions or unreported news.",
                symbol, daily_change_percentage
            ),
            daily_change_percentage: None,
        },
    };
    report.daily_change_percentage = Some(daily_change_percentage);
    report
}
