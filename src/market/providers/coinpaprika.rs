//! CoinPaprika market data provider.
//!
//! The `/v1/tickers` endpoint has no server-side filtering, so id selection
//! and top-N ranking both happen client-side. Currency-denominated metrics
//! live in a per-currency `quotes` map keyed by the upper-cased code.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::market::providers::MarketProvider;
use crate::market::{Coin, MarketQuery};

const BASE_URL: &str = "https://api.coinpaprika.com/v1";
const PROVIDER_NAME: &str = "CoinPaprika";

// Unranked tickers sort after every ranked one.
const UNRANKED: u32 = 9999;

pub struct CoinPaprikaProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(default)]
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    rank: Option<u32>,
    #[serde(default)]
    quotes: HashMap<String, RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    price: Option<f64>,
    percent_change_1h: Option<f64>,
    percent_change_24h: Option<f64>,
    market_cap: Option<f64>,
}

impl CoinPaprikaProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        CoinPaprikaProvider {
            client,
            base_url: base_url.into(),
        }
    }

    fn transform(mut raw: Vec<RawTicker>, query: &MarketQuery) -> Vec<Coin> {
        if query.has_ids() {
            raw.retain(|t| query.ids.iter().any(|id| *id == t.id));
        } else {
            raw.sort_by_key(|t| t.rank.unwrap_or(UNRANKED));
            raw.truncate(query.top_n);
        }

        let currency_key = query.currency.to_uppercase();
        raw.into_iter()
            .map(|t| {
                let quote = t.quotes.get(&currency_key);
                Coin {
                    id: t.id,
                    symbol: t.symbol,
                    name: t.name,
                    price: quote.and_then(|q| q.price),
                    change_1h: quote.and_then(|q| q.percent_change_1h),
                    change_24h: quote.and_then(|q| q.percent_change_24h),
                    market_cap: quote.and_then(|q| q.market_cap),
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketProvider for CoinPaprikaProvider {
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<Coin>> {
        let url = format!("{}/tickers", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;

        let raw: Vec<RawTicker> = resp.json().await.map_err(|e| Error::UnexpectedPayload {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let coins = Self::transform(raw, query);
        tracing::info!(count = coins.len(), "CoinPaprika returned market data");
        Ok(coins)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
