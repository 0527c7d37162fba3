//! Optional AI-generated market one-liner, appended to the report.
//!
//! Calls an OpenAI-compatible chat-completions endpoint (Groq by default).
//! Entirely best-effort: disabled, unconfigured, or failing summaries just
//! leave the report without the extra line.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::SummaryConfig;
use crate::market::sentiment::{FearGreedIndex, GlobalMetrics};
use crate::market::Coin;

const MAX_PROMPT_COINS: usize = 10;

pub struct SummaryClient {
    client: Client,
    config: SummaryConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl SummaryClient {
    pub fn new(client: Client, config: SummaryConfig) -> Self {
        SummaryClient { client, config }
    }

    pub async fn market_one_liner(
        &self,
        coins: &[Coin],
        global: Option<&GlobalMetrics>,
        fear_greed: Option<&FearGreedIndex>,
        currency: &str,
    ) -> Option<String> {
        if !self.config.enabled || self.config.api_key.trim().is_empty() {
            return None;
        }

        let prompt = build_prompt(coins, global, fear_greed, currency, &self.config.extra_prompt);
        match self.request_completion(&prompt).await {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::warn!(error = %e, "AI summary failed, posting without it");
                None
            }
        }
    }

    async fn request_completion(&self, prompt: &str) -> reqwest::Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": "You are a goofy crypto market commentator." },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": 180,
            "temperature": 1.0,
        });

        let resp: ChatResponse = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default())
    }
}

fn build_prompt(
    coins: &[Coin],
    global: Option<&GlobalMetrics>,
    fear_greed: Option<&FearGreedIndex>,
    currency: &str,
    extra: &str,
) -> String {
    let quick_summary = coins
        .iter()
        .take(MAX_PROMPT_COINS)
        .filter_map(|c| {
            c.change_24h
                .map(|p| format!("{} {:+.1}%", c.symbol.to_uppercase(), p))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let quick_summary = if quick_summary.is_empty() {
        "No data available".to_string()
    } else {
        quick_summary
    };

    let mut context = Vec::new();
    if let Some(global) = global {
        if let (Some(total), Some(change)) = (
            global.total_market_cap.get(&currency.to_lowercase()),
            global.market_cap_change_percentage_24h_usd,
        ) {
            context.push(format!(
                "Total Market Cap: ~${:.0} ({:+.1}%)",
                total, change
            ));
        }
    }
    if let Some(index) = fear_greed {
        context.push(format!(
            "Fear/Greed Index: {} ({})",
            index.value, index.value_classification
        ));
    }

    let mut prompt = format!(
        "Top Coins ({}): {}. Market Context: {}. Based on this data, make exactly one short, \
         funny, dumb, light-hearted line reacting to the market mood.",
        currency.to_uppercase(),
        quick_summary,
        context.join(". "),
    );
    if !extra.is_empty() {
        prompt.push(' ');
        prompt.push_str(extra);
    }
    prompt
}
