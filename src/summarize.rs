//! Prompt construction and article summarization through the LLM wrapper.

use log::warn;

use crate::llm::LlmClient;
use crate::report::Direction;

/// Temperature used for summarization prompts.
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Canned answer for a batch with no articles at all.
pub const NO_VALID_ARTICLES: &str = "No valid articles found to summarize.";

/// Canned answer when every provided summary is blank.
pub const NO_VALID_SUMMARIES: &str = "No valid summaries to combine.";

/// Builds the per-article analysis prompt.
pub fn article_prompt(symbol: &str, direction: Direction, text: &str) -> String {
    format!(
        "Analyze this processed news information about {} stock and explain how it might relate to the stock moving {}. Focus on key factors that could influence stock price.\n\nProcessed information: {}",
        symbol, direction, text
    )
}

/// Builds the roll-up prompt combining per-article summaries.
pub fn combined_prompt(symbol: &str, summaries: &[String]) -> String {
    format!(
        "Based on these news summaries about {}, provide a concise explanation of why the stock might be moving:\n\n{}",
        symbol,
        summaries.join(" ")
    )
}

/// Summarizes a single article; empty input produces nothing.
pub async fn summarize_article(
    client: &LlmClient,
    text: &str,
    symbol: &str,
    direction: Direction,
) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let prompt = article_prompt(symbol, direction, text);
    Some(client.generate(&prompt, SUMMARY_TEMPERATURE).await)
}

/// Combines per-article summaries into one explanation of the move.
pub async fn summarize_articles(client: &LlmClient, summaries: &[String], symbol: &str) -> String {
    if summaries.is_empty() {
        warn!("No summaries to combine for {}", symbol);
        return NO_VALID_ARTICLES.to_string();
    }
    let valid: Vec<String> = summaries
        .iter()
        .filter(|summary| !summary.trim().is_empty())
        .cloned()
        .collect();
    if valid.is_empty() {
        warn!("No valid summaries to combine for {}", symbol);
        return NO_VALID_SUMMARIES.to_string();
    }
    let prompt = combined_prompt(symbol, &valid);
    client.generate(&prompt, SUMMARY_TEMPERATURE).await
}
