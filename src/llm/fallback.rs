//! Deterministic templated responses for when the remote API is unusable.

use std::sync::LazyLock;

use log::info;
use regex::Regex;

/// Served for roll-up prompts asking why the stock might be moving.
const MARKET_CONDITIONS: &str = "Based on recent news, the stock movement appears to be driven by market conditions, sector trends, and company-specific developments. Investor sentiment and trading patterns may also be contributing factors.";

/// Served when no known prompt marker is present.
const GENERIC: &str = "The information provided suggests potential implications for financial markets and stock performance, with several factors that could influence investor decisions and market movements.";

/// Ticker-shaped token immediately preceding the word "stock".
static SYMBOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9.-]*)\s+stock\b").unwrap());

/// Word immediately following "moving".
static DIRECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmoving\s+(\w+)").unwrap());

/// Produces a canned explanatory sentence for the prompt.
///
/// A deliberately low-fidelity substitute for a model response: degraded
/// text beats no text during an outage.
pub fn fallback_response(prompt: &str) -> String {
    info!("Using fallback text generation");

    if prompt.contains("why the stock might be moving") {
        return MARKET_CONDITIONS.to_string();
    }

    if prompt.contains("might relate to the stock moving") {
        let symbol = SYMBOL_PATTERN
            .captures(prompt)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "this company".to_string());
        let direction = DIRECTION_PATTERN
            .captures(prompt)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "in its current direction".to_string());
        return format!(
            "The news provides relevant information about {}'s business operations, market positioning, and potential catalysts that could explain why the stock is moving {}. Key factors include industry trends, financial performance, and investor sentiment.",
            symbol, direction
        );
    }

    GENERIC.to_string()
}
