//! Market-wide sentiment context, used to color the optional AI one-liner.
//!
//! Both fetches are best-effort: any failure logs a warning and yields `None`
//! so the report is posted without the extra context.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

const GLOBAL_URL: &str = "https://api.coingecko.com/api/v3/global";
const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/?limit=1";

/// CoinGecko global market metrics.
#[derive(Clone, Debug, Deserialize)]
pub struct GlobalMetrics {
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
    pub market_cap_change_percentage_24h_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalMetrics,
}

/// One alternative.me fear/greed reading.
#[derive(Clone, Debug, Deserialize)]
pub struct FearGreedIndex {
    pub value: String,
    pub value_classification: String,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedIndex>,
}

pub async fn fetch_global_metrics(client: &Client) -> Option<GlobalMetrics> {
    match fetch_global(client, GLOBAL_URL).await {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch global metrics");
            None
        }
    }
}

pub async fn fetch_fear_greed_index(client: &Client) -> Option<FearGreedIndex> {
    match fetch_fear_greed(client, FEAR_GREED_URL).await {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch fear/greed index");
            None
        }
    }
}

async fn fetch_global(client: &Client, url: &str) -> reqwest::Result<GlobalMetrics> {
    let resp: GlobalResponse = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(resp.data)
}

async fn fetch_fear_greed(client: &Client, url: &str) -> reqwest::Result<Option<FearGreedIndex>> {
    let resp: FearGreedResponse = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(resp.data.into_iter().next())
}
